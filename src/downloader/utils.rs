// Process-backed LineSource and small shared helpers

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use super::errors::DownloadError;
use super::models::CommandStatus;
use super::traits::{LineSink, LineSource};

/// Runs a real program, merging stdout and stderr into one line stream
pub struct ProcessLineSource {
    program: String,
}

impl ProcessLineSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Forward lines from one pipe; invalid UTF-8 is replaced, not fatal
async fn pump_lines<R>(pipe: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read process output: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl LineSource for ProcessLineSource {
    fn name(&self) -> &str {
        &self.program
    }

    async fn run(
        &self,
        args: &[String],
        timeout: Duration,
        sink: LineSink<'_>,
    ) -> Result<CommandStatus, DownloadError> {
        tracing::debug!(program = %self.program, args = %args.join(" "), "spawning");

        let mut child = TokioCommand::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a dropped future (cancelled request) takes the process with it
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DownloadError::ToolNotFound(format!("{}: {}", self.program, e))
                }
                _ => DownloadError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Io(std::io::Error::other("stderr not captured")))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(pump_lines(stdout, tx.clone()));
        let stderr_task = tokio::spawn(pump_lines(stderr, tx));

        let deadline = Instant::now() + timeout;

        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(line)) => sink(line),
                // both pipes closed
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(program = %self.program, seconds = timeout.as_secs(), "timed out, killing");
                    let _ = child.kill().await;
                    stdout_task.abort();
                    stderr_task.abort();
                    return Ok(CommandStatus::timed_out());
                }
            }
        }

        match timeout_at(deadline, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(program = %self.program, code = ?status.code(), "exited");
                Ok(CommandStatus {
                    code: status.code(),
                    timed_out: false,
                })
            }
            Err(_) => {
                tracing::warn!(program = %self.program, "closed its output but did not exit, killing");
                let _ = child.kill().await;
                Ok(CommandStatus::timed_out())
            }
        }
    }
}

/// Keep at most `limit` bytes of output, cut on a char boundary
pub fn truncate_output(output: &str, limit: usize) -> &str {
    if output.len() <= limit {
        return output;
    }
    let mut end = limit;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    &output[..end]
}
