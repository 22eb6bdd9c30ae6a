//! Server configuration
//!
//! Defaults, overlaid by an optional TOML file, overlaid by `YTD_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downloader::tools::find_ytdlp;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// yt-dlp executable; located automatically when unset
    pub ytdlp_path: Option<String>,

    /// Directory downloads are written to
    pub download_dir: PathBuf,

    /// Deadline for `--list-formats` / `-F` queries
    pub list_timeout_secs: u64,

    /// Deadline for a whole download
    pub download_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    pub log_level: String,
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("downloads"))
        .join("ytd")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ytdlp_path: None,
            download_dir: default_download_dir(),
            list_timeout_secs: 60,
            download_timeout_secs: 3600,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured yt-dlp program, or the located one
    pub fn ytdlp_program(&self) -> String {
        self.ytdlp_path.clone().unwrap_or_else(find_ytdlp)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Load configuration from a TOML file; absent keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// File if present, defaults otherwise, then the environment.
    /// An unreadable or invalid file also falls back to defaults; the error is
    /// handed back so it can be logged once logging is up.
    pub fn load<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        let path = path.as_ref();
        let (config, error) = if path.exists() {
            match Self::from_file(path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            }
        } else {
            (Self::default(), None)
        };

        (config.with_env(|key| std::env::var(key).ok()), error)
    }

    /// Apply `YTD_*` overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = lookup("YTD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("YTD_PORT") {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid YTD_PORT={}", port),
            }
        }
        if let Some(path) = lookup("YTD_YTDLP") {
            self.ytdlp_path = Some(path);
        }
        if let Some(dir) = lookup("YTD_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        self
    }
}
