// Failure diagnostics - classifies yt-dlp error output
//
// Used when a listing produced no rows and yt-dlp exited non-zero, so the
// caller can tell a tool failure (blocked, private, bad URL, ...) apart from
// a parse or pairing failure.

use serde::Serialize;

/// Why yt-dlp refused or failed to list formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// HTTP 403 Forbidden
    Forbidden,
    /// HTTP 429 or explicit rate limiting
    RateLimited,
    /// Sign-in / "not a bot" challenge
    BotDetection,
    /// Video deleted, removed or otherwise gone
    Unavailable,
    /// Private video
    Private,
    /// Not available in this country
    GeoBlocked,
    /// Requires age confirmation
    AgeRestricted,
    /// yt-dlp has no extractor for the URL
    UnsupportedUrl,
    /// Socket timeout / unreachable network
    NetworkTimeout,
    Unknown,
}

impl FailureReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::RateLimited => "Rate limited by the site",
            Self::BotDetection => "Bot detection triggered",
            Self::Unavailable => "Video unavailable",
            Self::Private => "Private video",
            Self::GeoBlocked => "Geographic restriction",
            Self::AgeRestricted => "Age-restricted content",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown yt-dlp failure",
        }
    }

    /// Retrying later (or through another network) might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::RateLimited | Self::BotDetection | Self::NetworkTimeout
        )
    }
}

/// Classify error text printed by yt-dlp
pub fn diagnose_error(error: &str) -> FailureReason {
    let lower = error.to_lowercase();

    // Most specific first: "private video" also says "unavailable" on some sites
    if lower.contains("private video") || lower.contains("video is private") {
        return FailureReason::Private;
    }

    if lower.contains("sign in to confirm your age") || lower.contains("age-restricted") {
        return FailureReason::AgeRestricted;
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country") {
        return FailureReason::GeoBlocked;
    }

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return FailureReason::UnsupportedUrl;
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
    {
        return FailureReason::Unavailable;
    }

    if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
        return FailureReason::RateLimited;
    }

    if lower.contains("not a bot") || lower.contains("captcha") || lower.contains("unusual traffic") {
        return FailureReason::BotDetection;
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return FailureReason::Forbidden;
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("network is unreachable")
        || lower.contains("connection refused")
    {
        return FailureReason::NetworkTimeout;
    }

    FailureReason::Unknown
}

/// True for the lines yt-dlp uses to report a fatal problem
pub fn is_error_line(line: &str) -> bool {
    line.trim_start().starts_with("ERROR:")
}
