//! Vision Analyzer Server Library
//!
//! Usage metering and tier gating around an external vision model: every
//! authenticated user gets a usage record, free users get one analysis,
//! premium users get unlimited. This module exports the core types and the
//! router builder for testing and reuse.

pub mod analyzer;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod quota;
pub mod routes;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use analyzer::ImageAnalyzer;
use auth::TokenVerifier;
use constants::MAX_REQUEST_BODY_BYTES;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub verifier: Arc<dyn TokenVerifier>,
    pub analyzer: Arc<dyn ImageAnalyzer>,
}

impl AppState {
    /// Create a new AppState with the given database, configuration and
    /// capability implementations
    pub fn new(
        db: Db,
        config: Config,
        verifier: Arc<dyn TokenVerifier>,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Self {
        Self {
            db,
            config,
            verifier,
            analyzer,
        }
    }
}

/// Build the application router
///
/// API routes are mounted both bare (`/usage`) and under `/api`
/// (`/api/usage`) so either client base URL works. The body limit sits
/// above the image size cap; oversized uploads are rejected by the
/// analyze handler's own validation, not the transport layer.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/usage", get(routes::get_usage))
        .route("/analyze", post(routes::analyze_image))
        .route("/upgrade", post(routes::upgrade_plan))
        .route("/downgrade", post(routes::downgrade_plan));

    Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api", api.clone())
        .merge(api)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
