use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Reports whether the usage store can still open a read transaction.
/// Used by load balancers and uptime monitors; requires no authentication.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.clone();
    let store_status = tokio::task::spawn_blocking(move || match db.begin_read() {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Usage store health check failed: {:?}", e);
            "disconnected"
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if store_status == "connected" { "healthy" } else { "unhealthy" },
        "database": store_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
