use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analyzer::AnalysisFailure;
use crate::auth::AuthError;
use crate::constants::{ERR_ANALYSIS_FAILED, ERR_FREE_LIMIT_REACHED};
use crate::models::{UsageRecord, UsageResponse};

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Authentication failed: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis quota exceeded for user {user_id}")]
    QuotaExceeded {
        user_id: String,
        record: UsageRecord,
    },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(#[from] AnalysisFailure),
}

/// Implement IntoResponse to convert AppError into HTTP responses
///
/// Storage and runtime internals are logged and collapsed into a generic
/// 500 body; client-facing errors carry the message the frontend renders.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Transaction(ref e) => {
                tracing::error!("Transaction error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Table(ref e) => {
                tracing::error!("Table error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Commit(ref e) => {
                tracing::error!("Commit error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::TaskJoin(ref e) => {
                tracing::error!("Task join error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
            AppError::Unauthenticated(ref e) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": e.to_string() }))
            }
            AppError::InvalidInput(ref msg) => {
                (StatusCode::BAD_REQUEST, json!({ "message": msg }))
            }
            // Carries the current usage so clients can prompt an upgrade
            AppError::QuotaExceeded {
                ref user_id,
                ref record,
            } => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": ERR_FREE_LIMIT_REACHED,
                    "usage": UsageResponse::from_record(user_id, record),
                }),
            ),
            AppError::AnalysisFailed(ref e) => {
                tracing::error!("Upstream analysis failed: {}", e);
                (StatusCode::BAD_GATEWAY, json!({ "message": ERR_ANALYSIS_FAILED }))
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
