use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// `GET /api/v0/videos` - all manifests, newest first.
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let manifests = state.archive.list_videos().await?;
    Ok(Json(manifests))
}

/// `GET /api/v0/videos/{id}` - one manifest.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let manifest = state.archive.manifest(id).await?;
    Ok(Json(manifest))
}

/// `DELETE /api/v0/videos/{id}` - remove the video everywhere.
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.archive.delete_video(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v0/videos/{id}/health` - per-destination redundancy report.
pub async fn video_health(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.archive.check_video(id).await?;
    Ok(Json(report))
}
