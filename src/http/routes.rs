//! Axum router configuration

use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{
    download, download_audio, download_video, format_sizes, health_check, list_formats,
    tool_status, version_check,
};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // The web front-end is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    let youtube = Router::new()
        .route("/formats", get(list_formats))
        .route("/sizes", get(format_sizes))
        .route("/download", get(download))
        .route("/download/video", get(download_video))
        .route("/download/audio", get(download_audio))
        .route("/tool", get(tool_status));

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        .nest("/api/youtube", youtube)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
