// Locating yt-dlp and probing its version

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command as TokioCommand;

const BINARY_NAME: &str = "yt-dlp";

/// Install locations checked before falling back to `PATH`
const COMMON_PATHS: &[&str] = &[
    "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
    "/usr/local/bin/yt-dlp",    // Homebrew on Intel, pip --user installs
    "/usr/bin/yt-dlp",
];

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub path: Option<String>,
    pub version: Option<String>,
    pub is_available: bool,
}

/// Resolve the yt-dlp executable: common install paths, then `which`,
/// then the bare name so the OS can still search `PATH` at spawn time.
pub fn find_ytdlp() -> String {
    if let Some(path) = COMMON_PATHS.iter().find(|p| Path::new(p).exists()) {
        return path.to_string();
    }

    if let Ok(output) = std::process::Command::new("which").arg(BINARY_NAME).output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return path;
            }
        }
    }

    BINARY_NAME.to_string()
}

/// Run `<program> --version`; `None` if it cannot be started, fails or hangs
pub async fn probe_version(program: &str) -> Option<String> {
    let output = TokioCommand::new(program)
        .arg("--version")
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(VERSION_TIMEOUT, output).await {
        Ok(Ok(out)) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            (!version.is_empty()).then_some(version)
        }
        Ok(Ok(out)) => {
            tracing::debug!(program, code = ?out.status.code(), "--version failed");
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(program, "--version could not start: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!(program, "--version timed out");
            None
        }
    }
}

/// Status of the configured yt-dlp binary. A program that answers
/// `--version` counts as available even when it is not an absolute path.
pub async fn tool_info(program: &str) -> ToolInfo {
    let version = probe_version(program).await;
    let is_available = version.is_some();
    let path = if Path::new(program).is_absolute() || is_available {
        Some(program.to_string())
    } else {
        None
    };

    ToolInfo {
        name: BINARY_NAME.to_string(),
        path,
        version,
        is_available,
    }
}
