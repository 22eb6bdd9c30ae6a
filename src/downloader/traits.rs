// Line-producing command trait

use std::time::Duration;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::CommandStatus;

/// Receives output lines (stdout and stderr interleaved) as they are printed
pub type LineSink<'a> = &'a mut (dyn FnMut(String) + Send);

/// Runs yt-dlp (or a stand-in) and streams its output line by line.
///
/// Implementations must stop the command once `timeout` elapses and report
/// it through `CommandStatus::timed_out`; lines delivered before that stay
/// valid. Dropping the returned future cancels the command.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Name of the source (for logging)
    fn name(&self) -> &str;

    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        sink: LineSink<'_>,
    ) -> Result<CommandStatus, DownloadError>;
}
