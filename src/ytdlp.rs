// yt-dlp command surface: format listing, size lookup and downloads

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ServerConfig;
use crate::downloader::format_selector::{pair_with_best_audio, selector_for_quality};
use crate::downloader::format_table::{FormatTable, SizeListing};
use crate::downloader::utils::{truncate_output, ProcessLineSource};
use crate::downloader::{DownloadError, DownloadReport, FormatRecord, LineSource};

/// Bytes of yt-dlp output kept with a download report
const SUMMARY_LIMIT: usize = 2000;

const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// What a line of download output tells us
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// `[download]  12.5% of ~ 310.04MiB at 374.36KiB/s ETA 11:59`
    Progress {
        percent: f32,
        size: String,
        speed: String,
        eta: Option<String>,
    },
    /// `[download] Destination: <path>`
    Destination(String),
    /// `[Merger] Merging formats into ...`
    Merging,
    AlreadyDownloaded,
}

/// Parse one line of `yt-dlp --newline` output
pub fn parse_progress(line: &str) -> Option<ProgressEvent> {
    lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)\s+at\s+(\d+\.?\d*\s*\w+/s)(?:\s+ETA\s+(\S+))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        return Some(ProgressEvent::Progress {
            percent,
            size: caps.get(2).map_or("?", |m| m.as_str()).to_string(),
            speed: caps.get(3).map_or("?", |m| m.as_str()).to_string(),
            eta: caps.get(4).map(|m| m.as_str().to_string()),
        });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        return Some(ProgressEvent::Destination(caps.get(1)?.as_str().trim().to_string()));
    }

    if MERGE_RE.is_match(line) {
        return Some(ProgressEvent::Merging);
    }

    if ALREADY_RE.is_match(line) {
        return Some(ProgressEvent::AlreadyDownloaded);
    }

    None
}

/// Runs yt-dlp through a `LineSource` and feeds its output to the parsers
pub struct YtDlp {
    source: Arc<dyn LineSource>,
    download_dir: PathBuf,
    list_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlp {
    pub fn new(source: Arc<dyn LineSource>, config: &ServerConfig) -> Self {
        Self {
            source,
            download_dir: config.download_dir.clone(),
            list_timeout: config.list_timeout(),
            download_timeout: config.download_timeout(),
        }
    }

    /// Backed by the real yt-dlp binary
    pub fn from_config(config: &ServerConfig) -> Self {
        let program = config.ytdlp_program();
        tracing::info!("[YtDlp] using {}", program);
        Self::new(Arc::new(ProcessLineSource::new(program)), config)
    }

    pub fn program(&self) -> &str {
        self.source.name()
    }

    /// `yt-dlp --list-formats <url>`, parsed into records in table order
    pub async fn list_formats(&self, url: &str) -> Result<Vec<FormatRecord>, DownloadError> {
        let args = vec!["--list-formats".to_string(), url.to_string()];
        let mut table = FormatTable::new();

        let status = self
            .source
            .run(&args, self.list_timeout, &mut |line: String| {
                table.push_line(&line);
            })
            .await?;

        if status.timed_out && table.records().is_empty() {
            return Err(DownloadError::Timeout {
                seconds: self.list_timeout.as_secs(),
            });
        }

        let records = table.finish(status).inspect_err(|e| {
            if let DownloadError::FormatsUnavailable { reason, .. } = e {
                tracing::warn!(
                    "[YtDlp] listing {} failed: {} (retryable: {})",
                    url,
                    reason.description(),
                    reason.is_retryable()
                );
            }
        })?;
        tracing::info!("[YtDlp] {} formats for {}", records.len(), url);
        Ok(records)
    }

    /// `yt-dlp -F <url>` as format id -> bytes. A failing or timed-out run
    /// yields whatever sizes were printed before it stopped.
    pub async fn format_sizes(&self, url: &str) -> Result<HashMap<String, u64>, DownloadError> {
        let args = vec!["-F".to_string(), url.to_string()];
        let mut listing = SizeListing::new();

        let status = self
            .source
            .run(&args, self.list_timeout, &mut |line: String| listing.push_line(&line))
            .await?;

        let sizes = listing.finish();
        if !status.success() {
            tracing::warn!(
                "[YtDlp] -F ended with {:?} (timed out: {}), returning {} sizes",
                status.code,
                status.timed_out,
                sizes.len()
            );
        }
        Ok(sizes)
    }

    /// Legacy single-call download by quality tag ("720p", "best", ...)
    pub async fn download_quality(
        &self,
        url: &str,
        quality: Option<&str>,
    ) -> Result<DownloadReport, DownloadError> {
        let selector = selector_for_quality(quality);
        self.download(url, selector, &[]).await
    }

    /// Download `video_id`, merged with the best audio track unless it
    /// already carries one
    pub async fn download_video_with_best_audio(
        &self,
        url: &str,
        video_id: &str,
    ) -> Result<DownloadReport, DownloadError> {
        let records = self.list_formats(url).await?;
        let selector = pair_with_best_audio(&records, video_id)?;
        self.download(url, selector, &[]).await
    }

    /// Extract one audio format and convert it to mp3
    pub async fn download_audio_mp3(
        &self,
        url: &str,
        audio_id: &str,
    ) -> Result<DownloadReport, DownloadError> {
        self.download(url, audio_id.to_string(), &["-x", "--audio-format", "mp3"])
            .await
    }

    /// `<download_dir>/%(title)s.%(ext)s`, creating the directory
    fn output_template(&self) -> Result<String, DownloadError> {
        std::fs::create_dir_all(&self.download_dir)?;
        let template = self.download_dir.join(OUTPUT_TEMPLATE);
        Ok(template.to_string_lossy().replace('\\', "/"))
    }

    async fn download(
        &self,
        url: &str,
        selector: String,
        extra_args: &[&str],
    ) -> Result<DownloadReport, DownloadError> {
        let template = self.output_template()?;

        let mut args: Vec<String> = extra_args.iter().map(|a| a.to_string()).collect();
        args.extend([
            "-f".to_string(),
            selector.clone(),
            "--newline".to_string(),
            "-o".to_string(),
            template,
            url.to_string(),
        ]);

        tracing::info!("[YtDlp] downloading {} with selector {}", url, selector);

        let mut summary = String::new();
        let status = self
            .source
            .run(&args, self.download_timeout, &mut |line: String| {
                match parse_progress(&line) {
                    Some(ProgressEvent::Progress { percent, speed, .. }) => {
                        tracing::debug!("[YtDlp] {:.1}% at {}", percent, speed);
                    }
                    Some(ProgressEvent::Destination(path)) => {
                        tracing::debug!("[YtDlp] writing {}", path);
                    }
                    Some(ProgressEvent::Merging) => tracing::info!("[YtDlp] merging video and audio"),
                    Some(ProgressEvent::AlreadyDownloaded) => {
                        tracing::info!("[YtDlp] file already downloaded")
                    }
                    None => {}
                }
                if summary.len() < SUMMARY_LIMIT {
                    summary.push_str(&line);
                    summary.push('\n');
                }
            })
            .await?;

        if status.timed_out {
            return Err(DownloadError::Timeout {
                seconds: self.download_timeout.as_secs(),
            });
        }

        let report = DownloadReport {
            selector,
            exit_code: status.code,
            success: status.success(),
            summary: truncate_output(&summary, SUMMARY_LIMIT).to_string(),
        };

        if report.success {
            tracing::info!("[YtDlp] download finished: {}", url);
        } else {
            tracing::warn!(
                "[YtDlp] download failed ({:?}): {}",
                report.exit_code,
                report.summary.lines().last().unwrap_or("")
            );
        }

        Ok(report)
    }
}
