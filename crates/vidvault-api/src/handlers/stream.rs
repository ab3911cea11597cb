use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;
use vidvault_core::{ByteRange, PlacementMode};

/// `GET /api/v0/videos/{id}/stream` - the video bytes.
///
/// Single placements honor a `Range` header and answer `206` with
/// `Content-Range`; chunked placements ignore ranges and always stream the
/// full content with `Accept-Ranges: none`, mirroring what the stored layout
/// can actually serve.
pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let manifest = state.archive.manifest(id).await?;

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let range = range_header
        .as_deref()
        .and_then(|h| ByteRange::from_header(h, manifest.total_size));

    // A present but unsatisfiable Range header on a rangeable object is a
    // hard 416; rangeless layouts just fall through to a full response.
    if range_header.is_some() && range.is_none() && manifest.mode() == Some(PlacementMode::Single) {
        let response = Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(
                header::CONTENT_RANGE,
                format!("bytes */{}", manifest.total_size),
            )
            .body(Body::empty())
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        return Ok(response);
    }

    let resolved = state.archive.resolve(&manifest, range).await?;

    let body = Body::from_stream(
        resolved
            .stream
            .map(|item| item.map_err(|e| std::io::Error::other(e.to_string()))),
    );

    let accept_ranges = match manifest.mode() {
        Some(PlacementMode::Single) => "bytes",
        _ => "none",
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, manifest.content_type.as_str())
        .header(header::CONTENT_LENGTH, resolved.declared_length)
        .header(header::ACCEPT_RANGES, accept_ranges);

    if resolved.range_honored {
        if let Some(served) = range.and_then(|r| r.clamp(manifest.total_size)) {
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, served.content_range(manifest.total_size));
        }
    }

    builder
        .body(body)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))
}
