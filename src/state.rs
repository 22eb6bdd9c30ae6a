//! Application state shared by the HTTP handlers

use crate::config::ServerConfig;
use crate::ytdlp::YtDlp;

pub struct AppState {
    pub config: ServerConfig,
    pub ytdlp: YtDlp,
}

impl AppState {
    /// State backed by the real yt-dlp binary
    pub fn new(config: ServerConfig) -> Self {
        let ytdlp = YtDlp::from_config(&config);
        Self { config, ytdlp }
    }

    /// State around an existing runner (tests, alternative sources)
    pub fn with_ytdlp(config: ServerConfig, ytdlp: YtDlp) -> Self {
        Self { config, ytdlp }
    }
}
