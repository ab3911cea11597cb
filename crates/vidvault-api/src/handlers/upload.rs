use crate::error::ApiError;
use crate::handlers::content_type_for;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// `POST /api/v0/videos` - multipart upload, `video` field.
///
/// Responds once the primary placement is durable; backup replication
/// continues in the background.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let filename = original_name
            .as_deref()
            .ok_or_else(|| ApiError::InvalidRequest("Upload is missing a filename".to_string()))?;
        let content_type = content_type_for(filename).ok_or_else(|| {
            ApiError::InvalidRequest(format!("Unsupported video format: {filename}"))
        })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {e}")))?;

        if data.len() > state.max_upload_size {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte upload limit",
                data.len(),
                state.max_upload_size
            )));
        }

        let manifest = state
            .archive
            .upload_video(data, original_name, content_type.to_string())
            .await?;

        return Ok((StatusCode::CREATED, Json(manifest)));
    }

    Err(ApiError::InvalidRequest(
        "Multipart body has no 'video' field".to_string(),
    ))
}
