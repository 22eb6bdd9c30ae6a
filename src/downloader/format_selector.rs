// FormatSelector - picks yt-dlp format selector strings
//
// Handles:
// - Best audio track ranking (quality note > bitrate > codec > itag)
// - Pairing a chosen video format with that audio ("137+251")
// - Legacy quality tags ("720p") to bounded selector expressions

use super::errors::DownloadError;
use super::models::FormatRecord;

/// Quality words yt-dlp prints in the MORE INFO column, best first
const QUALITY_RANKS: &[(&str, u8)] = &[("high", 3), ("medium", 2), ("low", 1)];

/// Audio codec families, most preferred first
const CODEC_PREFERENCES: &[(&[&str], u8)] = &[
    (&["opus", "webm"], 3),
    (&["aac", "m4a"], 2),
    (&["mp3"], 1),
];

/// Heights with a bounded legacy selector
const QUALITY_HEIGHTS: &[(&[&str], u32)] = &[
    (&["1080p", "1080"], 1080),
    (&["720p", "720"], 720),
    (&["480p", "480"], 480),
    (&["360p", "360"], 360),
];

/// Video codec family excluded from bounded selectors (poor player support)
const EXCLUDED_VCODEC: &str = "av01";

fn quality_rank(note: &str) -> u8 {
    let note = note.to_lowercase();
    QUALITY_RANKS
        .iter()
        .find(|(word, _)| note.contains(word))
        .map_or(0, |(_, rank)| *rank)
}

fn codec_preference(codec: &str) -> u8 {
    let codec = codec.to_lowercase();
    CODEC_PREFERENCES
        .iter()
        .find(|(names, _)| names.iter().any(|n| codec.contains(n)))
        .map_or(0, |(_, pref)| *pref)
}

/// "130k" -> 130000 (milli-kbps keeps fractional rates ordered); junk -> 0
fn bitrate_key(abr: &str) -> u64 {
    let digits = abr.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic());
    digits
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map_or(0, |v| (v * 1000.0) as u64)
}

fn id_key(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

/// Composite ranking key, compared lexicographically, higher is better
fn audio_rank(record: &FormatRecord) -> (u8, u64, u8, u64) {
    (
        quality_rank(&record.note),
        bitrate_key(&record.audio_bitrate),
        codec_preference(&record.audio_codec),
        id_key(&record.id),
    )
}

/// Id of the best audio-only format, or `None` when the listing has none
pub fn select_best_audio(records: &[FormatRecord]) -> Option<&str> {
    records
        .iter()
        .filter(|r| r.is_audio())
        // max_by_key keeps the last maximum; reversing makes the earliest row win full ties
        .rev()
        .max_by_key(|r| audio_rank(r))
        .map(|r| r.id.as_str())
}

/// Selector for downloading `video_id` with sound.
///
/// A progressive format is fetched alone. Anything else (including an id
/// missing from the listing) is merged with the best audio track.
pub fn pair_with_best_audio(records: &[FormatRecord], video_id: &str) -> Result<String, DownloadError> {
    let chosen = records.iter().find(|r| r.id == video_id);

    if chosen.is_some_and(FormatRecord::is_progressive) {
        return Ok(video_id.to_string());
    }

    if chosen.is_none() {
        tracing::debug!(video_id, "format id not in listing, pairing anyway");
    }

    let audio_id = select_best_audio(records).ok_or_else(|| DownloadError::NoAudioCandidate {
        video_id: video_id.to_string(),
    })?;

    Ok(format!("{}+{}", video_id, audio_id))
}

/// Map a quality tag ("1080p", "720", ...) to a yt-dlp selector.
/// Unknown or missing tags mean plain "best".
pub fn selector_for_quality(quality: Option<&str>) -> String {
    let quality = quality.map(|q| q.trim().to_lowercase()).unwrap_or_default();

    QUALITY_HEIGHTS
        .iter()
        .find(|(tags, _)| tags.contains(&quality.as_str()))
        .map_or_else(
            || "best".to_string(),
            |(_, height)| {
                format!(
                    "bestvideo[height<={h}][vcodec!={excl}]+bestaudio/best[height<={h}]",
                    h = height,
                    excl = EXCLUDED_VCODEC
                )
            },
        )
}
