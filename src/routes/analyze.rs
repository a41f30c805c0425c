use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::auth::authenticate;
use crate::constants::*;
use crate::db::usage as store;
use crate::error::{AppError, Result};
use crate::models::UsageResponse;
use crate::quota;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub description: String,
    #[serde(flatten)]
    pub usage: UsageResponse,
}

/// Image extracted from the multipart `file` field
struct ImageUpload {
    data: Bytes,
    content_type: String,
    file_name: String,
}

/// Analyze an uploaded image, charging one analysis against the user's quota
///
/// # Request lifecycle
/// 1. Authenticate the bearer token; nothing else is touched on failure
/// 2. Extract and validate the upload server-side (presence, extension,
///    MIME type, size) regardless of any client-side checks
/// 3. Advisory quota pre-check, rejecting exhausted users before the
///    expensive upstream call
/// 4. Call the vision model with no store transaction held open
/// 5. Atomically consume one credit; the quota re-check inside the write
///    transaction is what actually prevents double-spending under
///    concurrency, so a request that loses the race gets 403 here even
///    though its upstream call succeeded
/// 6. Respond with the description and the refreshed usage
///
/// A failed or timed-out upstream call never reaches step 5, so it never
/// consumes quota.
pub async fn analyze_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>> {
    // 1. Authenticate first
    let user_id = authenticate(&state, &headers).await?;

    // 2. Extract and validate the upload
    let upload = read_image_field(multipart).await?;
    validate_upload(&upload)?;

    // 3. Advisory pre-check: cheap rejection before paying for analysis.
    //    The authoritative check happens inside try_increment.
    let record = {
        let db = state.db.clone();
        let user_id = user_id.clone();
        tokio::task::spawn_blocking(move || store::read_or_create(&db, &user_id)).await??
    };
    if !quota::can_proceed(&record).allowed {
        tracing::warn!(
            "Analysis rejected for user {}: quota already exhausted",
            user_id
        );
        return Err(AppError::QuotaExceeded { user_id, record });
    }

    // 4. Call the vision model. No store lock is held across this await;
    //    the client timeout bounds how long the request can hang here.
    let description = state
        .analyzer
        .describe(&upload.data, &upload.content_type)
        .await?;

    // 5. Consume a credit
    let record = {
        let db = state.db.clone();
        let user_id = user_id.clone();
        tokio::task::spawn_blocking(move || store::try_increment(&db, &user_id)).await??
    };

    tracing::info!(
        "Analysis completed for user {}: {} byte image, {} analyses used",
        user_id,
        upload.data.len(),
        record.analyses_used
    );

    // 6. Description plus refreshed usage
    Ok(Json(AnalyzeResponse {
        description,
        usage: UsageResponse::from_record(&user_id, &record),
    }))
}

/// Pull the `file` field out of the multipart form
async fn read_image_field(mut multipart: Multipart) -> Result<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        return Ok(ImageUpload {
            data,
            content_type,
            file_name,
        });
    }

    Err(AppError::InvalidInput(ERR_NO_FILE.to_string()))
}

/// Server-side validation of the uploaded artifact
///
/// UI hints are not trusted: extension, MIME type and size are all checked
/// here no matter what the client claimed.
fn validate_upload(upload: &ImageUpload) -> Result<()> {
    if upload.data.is_empty() {
        return Err(AppError::InvalidInput(ERR_NO_FILE.to_string()));
    }

    let extension = upload
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        tracing::warn!(
            "Rejected upload {:?}: extension not allowed",
            upload.file_name
        );
        return Err(AppError::InvalidInput(ERR_INVALID_FILE_TYPE.to_string()));
    }

    if !ALLOWED_MIME_TYPES.contains(&upload.content_type.as_str()) {
        tracing::warn!(
            "Rejected upload {:?}: content type {:?} not allowed",
            upload.file_name,
            upload.content_type
        );
        return Err(AppError::InvalidInput(ERR_INVALID_FILE_TYPE.to_string()));
    }

    if upload.data.len() > MAX_IMAGE_SIZE_BYTES {
        tracing::warn!(
            "Rejected upload {:?}: {} bytes (max: {})",
            upload.file_name,
            upload.data.len(),
            MAX_IMAGE_SIZE_BYTES
        );
        return Err(AppError::InvalidInput(ERR_FILE_TOO_LARGE.to_string()));
    }

    Ok(())
}
