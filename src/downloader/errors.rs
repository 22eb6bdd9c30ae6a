// Error types for format listing, pairing and downloads

use thiserror::Error;

use super::diagnostics::FailureReason;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp reported failure and not a single format row could be parsed
    #[error("yt-dlp --list-formats failed with exit code {}: {}{}", exit_label(.exit_code), reason_label(.reason), detail_suffix(.detail))]
    FormatsUnavailable {
        exit_code: Option<i32>,
        reason: FailureReason,
        detail: String,
    },

    /// Pairing was requested but the listing had no audio-only format
    #[error("Could not determine best audio format id to pair with video format {video_id}")]
    NoAudioCandidate { video_id: String },

    /// yt-dlp binary could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The command ran past its deadline and was killed
    #[error("yt-dlp timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or empty request parameter
    #[error("{0}")]
    InvalidRequest(String),
}

fn reason_label(reason: &FailureReason) -> &'static str {
    reason.description()
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" ({})", detail)
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated)".to_string(),
    }
}

impl DownloadError {
    /// Whether the failure came from yt-dlp itself rather than from parsing or pairing
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::FormatsUnavailable { .. } | Self::ToolNotFound(_) | Self::Timeout { .. }
        )
    }
}
