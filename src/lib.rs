//! ytd-server
//!
//! Lists the formats yt-dlp offers for a video, pairs a chosen video-only
//! format with the best audio track and runs the download.

pub mod config;
pub mod downloader;
pub mod http;
pub mod state;
pub mod ytdlp;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::create_router;
use crate::state::AppState;

/// Bind the configured address and serve until the process is stopped
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
