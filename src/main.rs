use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vision_analyzer_server::analyzer::OpenAiVision;
use vision_analyzer_server::auth::JwtVerifier;
use vision_analyzer_server::{app, open_database, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vision_analyzer_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vision Analyzer Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Open the usage store
    let db = open_database(&config.database_path)?;

    // Wire up the token verifier and the vision model client
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));
    let analyzer = Arc::new(OpenAiVision::new(&config)?);
    tracing::info!(
        "Analysis backend: {} at {} (timeout {}s)",
        config.openai_model,
        config.openai_base_url,
        config.analysis_timeout_secs
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origins
                .iter()
                .map(|s| s.parse())
                .collect::<Result<Vec<axum::http::HeaderValue>, _>>()?,
        )
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Create app state and build the router
    let state = AppState::new(db, config.clone(), verifier, analyzer);
    let app = app(state).layer(cors).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
