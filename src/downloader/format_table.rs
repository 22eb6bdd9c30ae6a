// FormatTable - parser for `yt-dlp --list-formats` text output
//
// A row looks like:
//   137 mp4 1920x1080 30 │ 80.14MiB 3300k https │ avc1.640028 3300k video only 1080p, mp4_dash
//
// Each of the three pipe-separated segments has its own small grammar:
// - head:     ID EXT [RESOLUTION | "audio only"] [FPS] ...
// - transfer: [~]FILESIZE TBR PROTO
// - codecs:   VCODEC VBR ACODEC ... "audio only" / "video only" ... free text
//
// Rows that do not fit are skipped with a reason, never fatal.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::diagnostics::{diagnose_error, is_error_line};
use super::errors::DownloadError;
use super::models::{CommandStatus, FormatKind, FormatRecord};
use super::size::{extract_size_bytes, parse_size};

/// Codec assumed for audio-only rows that name none
pub const DEFAULT_AUDIO_CODEC: &str = "mp3";

const AUDIO_ONLY: &str = "audio only";
const VIDEO_ONLY: &str = "video only";

lazy_static! {
    static ref SEGMENT_SPLIT: Regex = Regex::new(r"\s*[|│]\s*").unwrap();
    static ref SEPARATOR_ROW: Regex = Regex::new(r"^[─│┼╭╮╰╯\-|]+$").unwrap();
    static ref LISTING_SEPARATOR_ROW: Regex = Regex::new(r"^[\x{2500}-\x{257F}\-\s]{6,}$").unwrap();
    static ref PIXELS: Regex = Regex::new(r"^\d+x\d+$").unwrap();
    static ref DIGITS: Regex = Regex::new(r"^\d+$").unwrap();
    static ref BITRATE: Regex = Regex::new(r"^\d+k?$").unwrap();
    static ref SIZE_TOKEN: Regex = Regex::new(r"[KMGT]iB$").unwrap();
    static ref AUDIO_CODEC: Regex =
        Regex::new(r"(?i)^(mp4a|opus|vorbis|mp3|aac|ac-?3|ec-?3|eac3|flac|alac|dts)").unwrap();
}

/// Why a line did not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    /// Log output printed before the table header
    BeforeHeader,
    Header,
    /// Decorative row right under the header
    Separator,
    /// `sb*` storyboard pseudo-formats
    Storyboard,
    /// Fewer than three pipe-separated segments
    TooFewSegments,
    /// First segment lacks an id and an extension
    TooFewTokens,
}

/// Result of feeding one line to the parser
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Accepted(FormatRecord),
    Skipped(SkipReason),
}

/// Fields recovered from the ID/EXT/RESOLUTION/FPS segment
#[derive(Debug, Default, PartialEq)]
struct HeadFields {
    id: String,
    container: String,
    resolution: String,
    frame_rate: String,
}

/// Fields recovered from the FILESIZE/TBR/PROTO segment
#[derive(Debug, Default, PartialEq)]
struct TransferFields {
    size_token: String,
    total_bitrate: String,
}

/// Fields recovered from the VCODEC/VBR/ACODEC/MORE INFO segment
#[derive(Debug, Default, PartialEq)]
struct CodecFields {
    video_codec: String,
    audio_codec: String,
    note: String,
    audio_only: bool,
    video_only: bool,
}

/// True when `tokens[i..]` starts with `word` followed by "only"
fn only_pair(tokens: &[&str], i: usize, word: &str) -> bool {
    tokens[i] == word && tokens.get(i + 1) == Some(&"only")
}

fn parse_head(segment: &str) -> Option<HeadFields> {
    let tokens: Vec<&str> = segment.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let mut head = HeadFields {
        id: tokens[0].to_string(),
        container: tokens[1].to_string(),
        ..Default::default()
    };

    for i in 2..tokens.len() {
        let token = tokens[i];
        if PIXELS.is_match(token) {
            head.resolution = token.to_string();
        } else if DIGITS.is_match(token) {
            // first number is the frame rate, a later one is the channel count
            if head.frame_rate.is_empty() {
                head.frame_rate = token.to_string();
            }
        } else if only_pair(&tokens, i, "audio") {
            head.resolution = AUDIO_ONLY.to_string();
            break;
        }
    }

    Some(head)
}

fn parse_transfer(segment: &str) -> TransferFields {
    let mut transfer = TransferFields::default();

    for token in segment.split_whitespace() {
        if SIZE_TOKEN.is_match(token) || token.starts_with('~') {
            transfer.size_token = token.to_string();
        } else if BITRATE.is_match(token) {
            transfer.total_bitrate = token.to_string();
        }
    }

    transfer
}

fn parse_codecs(segment: &str) -> CodecFields {
    let tokens: Vec<&str> = segment.split_whitespace().collect();
    let mut codecs = CodecFields::default();
    let mut note: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if only_pair(&tokens, i, "audio") {
            codecs.audio_only = true;
            note.push(AUDIO_ONLY);
            i += 1;
        } else if only_pair(&tokens, i, "video") {
            codecs.video_only = true;
            note.push(VIDEO_ONLY);
            i += 1;
        } else if i == 0 && !codecs.audio_only {
            codecs.video_codec = token.to_string();
        } else if i == 1 && BITRATE.is_match(token) && !codecs.audio_only {
            // video bitrate: consumed, not kept
        } else if codecs.audio_codec.is_empty() && AUDIO_CODEC.is_match(token) {
            codecs.audio_codec = token.to_string();
        } else {
            note.push(token);
        }
        i += 1;
    }

    codecs.note = note.join(" ").trim().to_string();
    codecs
}

/// Build a record from a data row (header and separator already consumed)
fn parse_row(line: &str) -> Result<FormatRecord, SkipReason> {
    let segments: Vec<&str> = SEGMENT_SPLIT.splitn(line, 3).collect();
    if segments.len() < 3 {
        return Err(SkipReason::TooFewSegments);
    }

    let head = parse_head(segments[0].trim()).ok_or(SkipReason::TooFewTokens)?;
    let transfer = parse_transfer(segments[1]);
    let codecs = parse_codecs(segments[2]);

    let mut resolution = head.resolution;
    let mut video_codec = codecs.video_codec;
    let mut audio_codec = codecs.audio_codec;

    let kind = if resolution == AUDIO_ONLY || codecs.audio_only {
        resolution.clear();
        // without an "audio only" pair in segment 3 the codec sits in the video slot
        if !video_codec.is_empty() && AUDIO_CODEC.is_match(&video_codec) && audio_codec.is_empty() {
            audio_codec = std::mem::take(&mut video_codec);
        }
        if audio_codec.is_empty() {
            audio_codec = DEFAULT_AUDIO_CODEC.to_string();
        }
        FormatKind::Audio
    } else {
        // video-only rows and WxH rows are video; anything else defaults to it
        FormatKind::Video
    };

    let size_bytes = parse_size(transfer.size_token.trim_start_matches('~'));

    Ok(FormatRecord {
        id: head.id,
        container: head.container,
        resolution,
        frame_rate: head.frame_rate,
        video_codec,
        audio_codec,
        audio_bitrate: transfer.total_bitrate,
        note: codecs.note,
        kind,
        size_bytes,
    })
}

/// Incremental parser: feed lines as yt-dlp prints them, then `finish`.
#[derive(Debug, Default)]
pub struct FormatTable {
    table_started: bool,
    separator_skipped: bool,
    records: Vec<FormatRecord>,
    errors: Vec<String>,
}

impl FormatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one line, keeping it if it is a record
    pub fn push_line(&mut self, raw: &str) -> LineOutcome {
        let outcome = self.parse_line(raw);
        match &outcome {
            LineOutcome::Accepted(record) => self.records.push(record.clone()),
            LineOutcome::Skipped(SkipReason::Blank) => {}
            LineOutcome::Skipped(reason) => {
                tracing::debug!(?reason, line = raw, "skipped line");
            }
        }
        outcome
    }

    fn parse_line(&mut self, raw: &str) -> LineOutcome {
        let line = raw.trim();
        if line.is_empty() {
            return LineOutcome::Skipped(SkipReason::Blank);
        }

        if is_error_line(line) {
            self.errors.push(line.to_string());
        }

        if !self.table_started {
            if line.contains("ID") && line.contains("EXT") && line.contains("RESOLUTION") {
                self.table_started = true;
                return LineOutcome::Skipped(SkipReason::Header);
            }
            return LineOutcome::Skipped(SkipReason::BeforeHeader);
        }

        if !self.separator_skipped {
            self.separator_skipped = true;
            if !SEPARATOR_ROW.is_match(line) {
                tracing::debug!(line, "row under header is not a separator, dropping it anyway");
            }
            return LineOutcome::Skipped(SkipReason::Separator);
        }

        if line.starts_with("sb") {
            return LineOutcome::Skipped(SkipReason::Storyboard);
        }

        match parse_row(line) {
            Ok(record) => LineOutcome::Accepted(record),
            Err(reason) => LineOutcome::Skipped(reason),
        }
    }

    pub fn records(&self) -> &[FormatRecord] {
        &self.records
    }

    /// Close the table against yt-dlp's exit status.
    ///
    /// A failing tool is only an error when nothing could be parsed; partial
    /// output (e.g. after a timeout) still yields the rows seen so far.
    pub fn finish(self, status: CommandStatus) -> Result<Vec<FormatRecord>, DownloadError> {
        if !self.records.is_empty() || status.success() {
            if !status.success() {
                tracing::warn!(
                    exit_code = ?status.code,
                    timed_out = status.timed_out,
                    records = self.records.len(),
                    "yt-dlp did not exit cleanly, returning partial listing"
                );
            }
            return Ok(self.records);
        }

        let detail = self.errors.first().cloned().unwrap_or_default();
        let reason = diagnose_error(&self.errors.join("\n"));
        Err(DownloadError::FormatsUnavailable {
            exit_code: status.code,
            reason,
            detail,
        })
    }
}

/// Parse a complete listing in one call
pub fn parse_format_table<I, S>(lines: I, status: CommandStatus) -> Result<Vec<FormatRecord>, DownloadError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = FormatTable::new();
    for line in lines {
        table.push_line(line.as_ref());
    }
    table.finish(status)
}

/// Size lookup over `yt-dlp -F` output: format id -> bytes.
///
/// Framing is looser than `FormatTable`: the table starts at a line beginning
/// with "ID", at a box-drawing rule, or at the first line whose leading token
/// is a numeric itag. Only numeric ids are kept and rows without a size are
/// left out.
#[derive(Debug, Default)]
pub struct SizeListing {
    table_started: bool,
    sizes: HashMap<String, u64>,
}

impl SizeListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        let first = tokens.next().unwrap_or("");
        let is_itag = !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit());

        if !self.table_started {
            let upper = line.to_uppercase();
            if upper.starts_with("ID ") || upper.starts_with("ID\t") || LISTING_SEPARATOR_ROW.is_match(line) {
                self.table_started = true;
                return;
            }
            if !is_itag {
                return;
            }
            self.table_started = true;
        }

        if !is_itag {
            return;
        }

        let rest: Vec<&str> = tokens.collect();
        if let Some(bytes) = extract_size_bytes(&rest.join(" ")).filter(|b| *b > 0) {
            self.sizes.insert(first.to_string(), bytes);
        }
    }

    pub fn finish(self) -> HashMap<String, u64> {
        self.sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::diagnostics::FailureReason;

    const LISTING: &str = "\
[youtube] Extracting URL: https://www.youtube.com/watch?v=abc123
[youtube] abc123: Downloading webpage
[info] Available formats for abc123:
ID  EXT   RESOLUTION FPS CH │   FILESIZE   TBR PROTO │ VCODEC          VBR ACODEC      ABR ASR MORE INFO
────────────────────────────────────────────────────────────────────────────────────────────────────
sb0 mhtml 48x27        0    │                  mhtml │ images                                  storyboard
139 m4a   audio only      2 │    1.21MiB   49k https │ audio only          mp4a.40.5   49k 22k low, m4a_dash
251 webm  audio only      2 │    3.30MiB  132k https │ audio only          opus       132k 48k medium, webm_dash

18  mp4   640x360     30  2 │ ~ 9.54MiB  386k https │ avc1.42001E         mp4a.40.2       44k 360p
137 mp4   1920x1080   30    │   80.14MiB 3300k https │ avc1.640028   3300k video only          1080p, mp4_dash
";

    fn lines() -> Vec<&'static str> {
        LISTING.lines().collect()
    }

    #[test]
    fn parses_listing_in_table_order() {
        let records = parse_format_table(lines(), CommandStatus::exited(0)).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["139", "251", "18", "137"]);
    }

    #[test]
    fn audio_row_is_classified_and_cleared() {
        let records = parse_format_table(lines(), CommandStatus::exited(0)).unwrap();
        let audio = &records[0];
        assert_eq!(audio.kind, FormatKind::Audio);
        assert_eq!(audio.resolution, "");
        assert_eq!(audio.container, "m4a");
        assert_eq!(audio.audio_codec, "mp4a.40.5");
        assert_eq!(audio.video_codec, "");
        assert_eq!(audio.audio_bitrate, "49k");
        assert_eq!(audio.note, "audio only 49k 22k low, m4a_dash");
        assert_eq!(audio.size_bytes, Some(1_268_776));
    }

    #[test]
    fn progressive_row_keeps_both_codecs() {
        let records = parse_format_table(lines(), CommandStatus::exited(0)).unwrap();
        let muxed = &records[2];
        assert_eq!(muxed.kind, FormatKind::Video);
        assert_eq!(muxed.resolution, "640x360");
        assert_eq!(muxed.frame_rate, "30");
        assert_eq!(muxed.video_codec, "avc1.42001E");
        assert_eq!(muxed.audio_codec, "mp4a.40.2");
        assert_eq!(muxed.note, "44k 360p");
        assert_eq!(muxed.size_bytes, Some(10_003_415));
        assert!(muxed.is_progressive());
    }

    #[test]
    fn video_only_av1_row() {
        let row = "399 mp4 1920x1080 30 | 1.2GiB 2100k https | av01.0.08M.08 2100k video only 1080p, mp4_dash";
        let record = parse_row(row).unwrap();
        assert_eq!(record.kind, FormatKind::Video);
        assert_eq!(record.resolution, "1920x1080");
        assert_eq!(record.frame_rate, "30");
        assert_eq!(record.video_codec, "av01.0.08M.08");
        assert_eq!(record.audio_codec, "");
        assert!(record.note.contains("video only"));
        assert_eq!(record.size_bytes, Some(1_288_490_188));
        assert!(!record.is_progressive());
    }

    #[test]
    fn audio_without_codec_gets_default() {
        let row = "140 m4a audio only | 3.24MiB 130k https | audio only medium";
        let record = parse_row(row).unwrap();
        assert_eq!(record.kind, FormatKind::Audio);
        assert_eq!(record.audio_codec, DEFAULT_AUDIO_CODEC);
        assert_eq!(record.note, "audio only medium");
    }

    #[test]
    fn audio_only_in_head_segment_alone_classifies_audio() {
        let row = "140 m4a audio only 2 | 3.24MiB 130k https | mp4a.40.2 medium";
        let record = parse_row(row).unwrap();
        assert_eq!(record.kind, FormatKind::Audio);
        assert_eq!(record.resolution, "");
        assert_eq!(record.video_codec, "");
        assert_eq!(record.audio_codec, "mp4a.40.2");
        assert_eq!(record.note, "medium");

        // a non-codec token in the video slot is left alone, codec defaults
        let record = parse_row("141 m4a audio only | 1MiB 48k https | unknown").unwrap();
        assert_eq!(record.kind, FormatKind::Audio);
        assert_eq!(record.video_codec, "unknown");
        assert_eq!(record.audio_codec, DEFAULT_AUDIO_CODEC);
    }

    #[test]
    fn row_without_dimensions_or_markers_defaults_to_video() {
        let record = parse_row("hls-1 mp4 unknown | ~ 2MiB 900k m3u8 | avc1 mp4a.40.2").unwrap();
        assert_eq!(record.kind, FormatKind::Video);
        assert_eq!(record.resolution, "");
        assert_eq!(record.video_codec, "avc1");
        assert_eq!(record.audio_codec, "mp4a.40.2");
    }

    #[test]
    fn head_segment_rules() {
        let head = parse_head("22 mp4 1280x720 30 2").unwrap();
        assert_eq!(head.resolution, "1280x720");
        assert_eq!(head.frame_rate, "30");

        let head = parse_head("140 m4a audio only 2").unwrap();
        assert_eq!(head.resolution, AUDIO_ONLY);
        assert_eq!(head.frame_rate, "");

        assert_eq!(parse_head("140"), None);
    }

    #[test]
    fn transfer_segment_rules() {
        let transfer = parse_transfer("~ 16.27MiB  484k https");
        assert_eq!(transfer.size_token, "16.27MiB");
        assert_eq!(transfer.total_bitrate, "484k");

        let transfer = parse_transfer("≈ 2.00MiB 129 m3u8");
        assert_eq!(transfer.size_token, "2.00MiB");
        assert_eq!(transfer.total_bitrate, "129");
    }

    #[test]
    fn codec_segment_rules() {
        let codecs = parse_codecs("avc1.640028 4458k video only 1080p, mp4_dash");
        assert!(codecs.video_only);
        assert!(!codecs.audio_only);
        assert_eq!(codecs.video_codec, "avc1.640028");
        assert_eq!(codecs.note, "video only 1080p, mp4_dash");

        let codecs = parse_codecs("audio only opus 160k 48k high, webm_dash");
        assert!(codecs.audio_only);
        assert_eq!(codecs.video_codec, "");
        assert_eq!(codecs.audio_codec, "opus");
        assert_eq!(codecs.note, "audio only 160k 48k high, webm_dash");
    }

    #[test]
    fn skip_reasons_are_reported() {
        let mut table = FormatTable::new();
        assert_eq!(table.push_line("   "), LineOutcome::Skipped(SkipReason::Blank));
        assert_eq!(table.push_line("[info] Available formats"), LineOutcome::Skipped(SkipReason::BeforeHeader));
        assert_eq!(table.push_line("ID EXT RESOLUTION | FILESIZE | VCODEC"), LineOutcome::Skipped(SkipReason::Header));
        assert_eq!(table.push_line("137 mp4 1920x1080 | 1MiB | avc1"), LineOutcome::Skipped(SkipReason::Separator));
        assert_eq!(table.push_line("sb1 mhtml 45x80 | mhtml | images"), LineOutcome::Skipped(SkipReason::Storyboard));
        assert_eq!(table.push_line("137 mp4 1920x1080 | 1MiB"), LineOutcome::Skipped(SkipReason::TooFewSegments));
        assert_eq!(table.push_line("137 | 1MiB | avc1"), LineOutcome::Skipped(SkipReason::TooFewTokens));
        assert!(matches!(table.push_line("137 mp4 1920x1080 | 1MiB | avc1"), LineOutcome::Accepted(_)));
        assert_eq!(table.records().len(), 1);
    }

    #[test]
    fn ascii_pipes_work_too() {
        let out = "ID EXT RESOLUTION FPS | FILESIZE TBR PROTO | VCODEC\n\
                   ------------------------------------------------\n\
                   22 mp4 1280x720 30 | ~25.3MiB 1200k https | avc1.64001F mp4a.40.2 720p";
        let records = parse_format_table(out.lines(), CommandStatus::exited(0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size_bytes, Some(26_528_972));
        assert!(records[0].is_progressive());
    }

    #[test]
    fn unparseable_size_leaves_field_empty() {
        let record = parse_row("22 mp4 1280x720 30 | ~ 120k https | avc1 mp4a.40.2").unwrap();
        assert_eq!(record.size_bytes, None);
    }

    #[test]
    fn empty_output_with_success_is_empty_list() {
        let records = parse_format_table(Vec::<String>::new(), CommandStatus::exited(0)).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_output_with_failure_is_an_error() {
        let out = vec!["ERROR: [youtube] abc123: Video unavailable"];
        let err = parse_format_table(out, CommandStatus::exited(1)).unwrap_err();
        match err {
            DownloadError::FormatsUnavailable { exit_code, reason, detail } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(reason, FailureReason::Unavailable);
                assert!(detail.contains("Video unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partial_output_survives_failing_exit() {
        let mut out = lines();
        out.push("ERROR: unable to download video data: HTTP Error 403: Forbidden");
        let records = parse_format_table(out, CommandStatus::exited(1)).unwrap();
        assert_eq!(records.len(), 4);

        let records = parse_format_table(lines(), CommandStatus::timed_out()).unwrap();
        assert_eq!(records.len(), 4);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parser_logs_pass_the_crate_filter() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("ytd_server=debug"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let out = vec![
            "ID EXT RESOLUTION | FILESIZE | VCODEC",
            "---------------------------------",
            "137 mp4 1920x1080 | 1MiB",
            "22 mp4 1280x720 30 | 5MiB 900k https | avc1 mp4a.40.2",
        ];
        let records = tracing::subscriber::with_default(subscriber, || {
            parse_format_table(out, CommandStatus::exited(1))
        })
        .unwrap();
        assert_eq!(records.len(), 1);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("TooFewSegments"), "{logs}");
        assert!(logs.contains("partial listing"), "{logs}");
        assert_eq!(logs.matches("137 mp4 1920x1080 | 1MiB").count(), 1, "{logs}");
    }

    #[test]
    fn size_listing_maps_numeric_ids() {
        let mut listing = SizeListing::new();
        for line in LISTING.lines() {
            listing.push_line(line);
        }
        let sizes = listing.finish();
        assert_eq!(sizes.get("139"), Some(&1_268_776));
        assert_eq!(sizes.get("137"), Some(&84_032_880));
        assert_eq!(sizes.get("18"), Some(&10_003_415));
        assert!(!sizes.contains_key("sb0"));
        assert_eq!(sizes.len(), 4);
    }

    #[test]
    fn size_listing_starts_at_first_numeric_row() {
        let mut listing = SizeListing::new();
        listing.push_line("some banner");
        listing.push_line("140 m4a audio only 2 | 3.24MiB 130k https | audio only mp4a.40.2");
        listing.push_line("dash-video mp4 1280x720 | 5MiB");
        assert_eq!(listing.finish().len(), 1);
    }
}
