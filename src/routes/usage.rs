use axum::{extract::State, http::HeaderMap, Json};

use crate::auth::authenticate;
use crate::db::usage as store;
use crate::error::Result;
use crate::models::UsageResponse;
use crate::AppState;

/// Current usage and tier for the authenticated user
///
/// Lazily creates the usage record on first touch: every authenticated
/// caller starts on the free tier with zero analyses used. No other state
/// is mutated.
pub async fn get_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>> {
    let user_id = authenticate(&state, &headers).await?;

    let db = state.db.clone();
    let record = {
        let user_id = user_id.clone();
        tokio::task::spawn_blocking(move || store::read_or_create(&db, &user_id)).await??
    };

    Ok(Json(UsageResponse::from_record(&user_id, &record)))
}
