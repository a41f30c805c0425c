use axum::{extract::State, http::HeaderMap, Json};

use crate::auth::authenticate;
use crate::db::usage as store;
use crate::error::Result;
use crate::models::{Tier, UsageResponse};
use crate::AppState;

/// Switch the authenticated user to the premium tier
pub async fn upgrade_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>> {
    switch_tier(state, headers, Tier::Premium).await
}

/// Switch the authenticated user back to the free tier
pub async fn downgrade_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>> {
    switch_tier(state, headers, Tier::Free).await
}

/// Shared plan-switch flow: authenticate, set the tier, return fresh usage
///
/// Idempotent by construction, and the usage counter survives the switch:
/// a downgraded premium user keeps every analysis they already spent.
async fn switch_tier(
    state: AppState,
    headers: HeaderMap,
    tier: Tier,
) -> Result<Json<UsageResponse>> {
    let user_id = authenticate(&state, &headers).await?;

    let db = state.db.clone();
    let record = {
        let user_id = user_id.clone();
        tokio::task::spawn_blocking(move || store::set_tier(&db, &user_id, tier)).await??
    };

    tracing::info!(
        "User {} switched to {:?} tier ({} analyses used)",
        user_id,
        record.tier,
        record.analyses_used
    );

    Ok(Json(UsageResponse::from_record(&user_id, &record)))
}
