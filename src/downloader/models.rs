// Common data models for format listing and downloads

use serde::{Deserialize, Serialize};

/// Media type carried by a format row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Video,
    Audio,
}

/// One normalized row of yt-dlp's format table
///
/// Serialized with the field names the web front-end reads
/// (`ext`, `fps`, `vcodec`, `acodec`, `abr`, `type`, `filesize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRecord {
    /// Format id / itag (e.g. "137", "251"); only unique within one listing
    pub id: String,
    /// Container extension (mp4, webm, m4a)
    #[serde(rename = "ext")]
    pub container: String,
    /// "1920x1080", or empty for audio and unknown rows
    pub resolution: String,
    #[serde(rename = "fps")]
    pub frame_rate: String,
    #[serde(rename = "vcodec")]
    pub video_codec: String,
    #[serde(rename = "acodec")]
    pub audio_codec: String,
    /// Total bitrate column as printed ("130k"), also used as a sort key
    #[serde(rename = "abr")]
    pub audio_bitrate: String,
    /// Leftover annotations: "audio only", "video only", "medium", "1080p," ...
    pub note: String,
    #[serde(rename = "type")]
    pub kind: FormatKind,
    #[serde(rename = "filesize")]
    pub size_bytes: Option<u64>,
}

impl FormatRecord {
    pub fn is_audio(&self) -> bool {
        self.kind == FormatKind::Audio
    }

    /// Carries its own audio track, so it can be downloaded without pairing.
    /// An explicit "video only" note overrides a codec that happens to be set.
    pub fn is_progressive(&self) -> bool {
        self.kind == FormatKind::Video
            && !self.audio_codec.is_empty()
            && !self.note.to_lowercase().contains("video only")
    }
}

/// How a finished (or killed) command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandStatus {
    /// Exit code; `None` when the process was killed or ended by a signal
    pub code: Option<i32>,
    /// The deadline expired and the process was terminated
    pub timed_out: bool,
}

impl CommandStatus {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            code: None,
            timed_out: true,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }
}

/// Outcome of a download invocation
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    /// Format selector handed to yt-dlp ("137+251", "best", ...)
    pub selector: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Head of the combined yt-dlp output
    pub summary: String,
}

impl DownloadReport {
    /// Plain-text message returned to HTTP clients
    pub fn message(&self) -> String {
        if self.success {
            "Download completed successfully!".to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("Download failed ({})", code),
                None => "Download failed (terminated)".to_string(),
            }
        }
    }
}
