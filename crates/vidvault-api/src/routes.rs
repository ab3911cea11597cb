use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vidvault_core::Config;

pub fn build_router(state: Arc<AppState>, config: &Config) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/v0/videos",
            post(handlers::upload::upload_video).get(handlers::videos::list_videos),
        )
        .route(
            "/api/v0/videos/{id}",
            get(handlers::videos::get_video).delete(handlers::videos::delete_video),
        )
        .route(
            "/api/v0/videos/{id}/stream",
            get(handlers::stream::stream_video),
        )
        .route(
            "/api/v0/videos/{id}/health",
            get(handlers::videos::video_health),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Multipart framing overhead on top of the payload limit.
        .layer(DefaultBodyLimit::max(state.max_upload_size + 64 * 1024))
        .with_state(state);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    if config.cors_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}
