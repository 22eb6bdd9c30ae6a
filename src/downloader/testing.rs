// Canned LineSource for tests: replays fixed output, records invocations

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::CommandStatus;
use super::traits::{LineSink, LineSource};

pub struct CannedSource {
    lines: Vec<String>,
    status: CommandStatus,
    missing: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl CannedSource {
    /// Replays `output` line by line, then ends with `status`
    pub fn new(output: &str, status: CommandStatus) -> Self {
        Self {
            lines: output.lines().map(str::to_string).collect(),
            status,
            missing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Behaves like a binary that is not installed
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::new("", CommandStatus::default())
        }
    }

    /// Argument lists of every run so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Vec<String> {
        self.calls().pop().unwrap_or_default()
    }
}

#[async_trait]
impl LineSource for CannedSource {
    fn name(&self) -> &str {
        "canned"
    }

    async fn run(
        &self,
        args: &[String],
        _timeout: Duration,
        sink: LineSink<'_>,
    ) -> Result<CommandStatus, DownloadError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.missing {
            return Err(DownloadError::ToolNotFound("canned: not installed".to_string()));
        }
        for line in &self.lines {
            sink(line.clone());
        }
        Ok(self.status)
    }
}
