//! HTTP request handlers
//!
//! Every endpoint takes its parameters from the query string. Failures are
//! plain text beginning with "Error: ".

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::downloader::tools::{tool_info, ToolInfo};
use crate::downloader::{DownloadError, DownloadReport, FormatRecord};
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    /// The request was understood but cannot be served (no audio to pair)
    Unprocessable(String),
    /// yt-dlp failed or is missing
    ToolFailed(String),
    Timeout(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            HttpError::ToolFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            HttpError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, format!("Error: {}", msg)).into_response()
    }
}

impl From<DownloadError> for HttpError {
    fn from(err: DownloadError) -> Self {
        let msg = err.to_string();
        match err {
            DownloadError::InvalidRequest(_) => HttpError::BadRequest(msg),
            DownloadError::NoAudioCandidate { .. } => HttpError::Unprocessable(msg),
            DownloadError::Timeout { .. } => HttpError::Timeout(msg),
            ref e if e.is_tool_failure() => HttpError::ToolFailed(msg),
            _ => HttpError::InternalError(msg),
        }
    }
}

/// A query parameter that must be present and non-blank
fn required(value: Option<String>, name: &str) -> Result<String, DownloadError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DownloadError::InvalidRequest(format!("missing query parameter '{}'", name)))
}

/// Failed transfers are reported as 502 with the summary message
fn report_response(report: DownloadReport) -> Response {
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, report.message()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QualityQuery {
    pub url: Option<String>,
    pub quality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    pub url: Option<String>,
    pub video_format_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    pub url: Option<String>,
    pub audio_format_id: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("ytd-server v", env!("CARGO_PKG_VERSION"))
}

/// GET /api/youtube/formats?url=
pub async fn list_formats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<Vec<FormatRecord>>, HttpError> {
    let url = required(query.url, "url")?;
    Ok(Json(state.ytdlp.list_formats(&url).await?))
}

/// GET /api/youtube/sizes?url=
pub async fn format_sizes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<HashMap<String, u64>>, HttpError> {
    let url = required(query.url, "url")?;
    Ok(Json(state.ytdlp.format_sizes(&url).await?))
}

/// GET /api/youtube/download?url=&quality=
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QualityQuery>,
) -> Result<Response, HttpError> {
    let url = required(query.url, "url")?;
    let report = state
        .ytdlp
        .download_quality(&url, query.quality.as_deref())
        .await?;
    Ok(report_response(report))
}

/// GET /api/youtube/download/video?url=&videoFormatId=
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VideoQuery>,
) -> Result<Response, HttpError> {
    let url = required(query.url, "url")?;
    let video_id = required(query.video_format_id, "videoFormatId")?;
    let report = state
        .ytdlp
        .download_video_with_best_audio(&url, &video_id)
        .await?;
    Ok(report_response(report))
}

/// GET /api/youtube/download/audio?url=&audioFormatId=
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AudioQuery>,
) -> Result<Response, HttpError> {
    let url = required(query.url, "url")?;
    let audio_id = required(query.audio_format_id, "audioFormatId")?;
    let report = state.ytdlp.download_audio_mp3(&url, &audio_id).await?;
    Ok(report_response(report))
}

/// GET /api/youtube/tool
pub async fn tool_status(State(state): State<Arc<AppState>>) -> Json<ToolInfo> {
    Json(tool_info(state.ytdlp.program()).await)
}
