use crate::utils::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const STDERR_TAIL_LINES: usize = 12;

/// Runs an external tool with a hard timeout, streaming its stdout line by line.
///
/// The child is spawned with `kill_on_drop`, so returning early on timeout or
/// cancellation terminates it.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    tool_path: String,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(tool_path: String, timeout_seconds: u64) -> Self {
        Self {
            tool_path,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub async fn check_availability(&self, version_arg: &str) -> Result<()> {
        debug!("Checking tool availability at: {}", self.tool_path);

        let output = Command::new(&self.tool_path)
            .arg(version_arg)
            .output()
            .await
            .map_err(|e| {
                Error::configuration(format!("Failed to run {}: {}", self.tool_path, e))
            })?;

        if !output.status.success() {
            return Err(Error::configuration(format!(
                "{} check failed with exit code: {}",
                self.tool_path, output.status
            )));
        }

        debug!("{} is available", self.tool_path);
        Ok(())
    }

    pub async fn run<F>(
        &self,
        args: &[String],
        cancel: &CancellationToken,
        mut on_line: F,
    ) -> Result<()>
    where
        F: FnMut(&str) + Send,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut command = Command::new(&self.tool_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running: {} {}", self.tool_path, args.join(" "));

        let mut child = command
            .spawn()
            .map_err(|e| Error::render_failed(format!("Failed to spawn {}: {}", self.tool_path, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::render_failed("Tool stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::render_failed("Tool stderr was not captured"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr.read_to_string(&mut buffer).await;
            buffer
        });

        let work = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
            }
            child.wait().await
        };

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} cancelled", self.tool_path);
                return Err(Error::Cancelled);
            }
            result = tokio::time::timeout(self.timeout, work) => match result {
                Ok(status) => status?,
                Err(_) => {
                    return Err(Error::render_failed(format!(
                        "{} timed out after {} seconds",
                        self.tool_path,
                        self.timeout.as_secs()
                    )));
                }
            },
        };

        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let tail = stderr_tail(&stderr, STDERR_TAIL_LINES);
            error!("{} failed with exit code {}", self.tool_path, status);
            debug!("Stderr: {}", stderr);

            return Err(Error::render_failed(format!(
                "{} failed with exit code {}: {}",
                self.tool_path, status, tail
            )));
        }

        Ok(())
    }
}

/// Last `lines` non-empty lines of a tool's stderr, joined with " | ".
pub fn stderr_tail(stderr: &str, lines: usize) -> String {
    let collected: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = collected.len().saturating_sub(lines);
    collected[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TempOutput;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = "line one\n\nline two\nline three\n";
        assert_eq!(stderr_tail(stderr, 2), "line two | line three");
        assert_eq!(stderr_tail(stderr, 10), "line one | line two | line three");
        assert_eq!(stderr_tail("", 3), "");
    }

    #[tokio::test]
    async fn test_missing_tool_fails_to_spawn() {
        let runner = ToolRunner::new("/nonexistent/tool-binary".to_string(), 5);
        let cancel = CancellationToken::new();
        let result = runner.run(&["-version".to_string()], &cancel, |_| {}).await;
        assert!(matches!(result, Err(Error::RenderFailed { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_run() {
        let runner = ToolRunner::new("sleep".to_string(), 30);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = runner.run(&["5".to_string()], &cancel, |_| {}).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_outliving_timeout_is_render_failure() {
        let runner = ToolRunner::new("sleep".to_string(), 1);
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();

        let result = runner.run(&["5".to_string()], &cancel, |_| {}).await;

        assert!(matches!(result, Err(Error::RenderFailed { ref message }) if message.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_timed_out_render_discards_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let temp = TempOutput::new(&output, "partial");
        let script = format!("printf partial > '{}'; sleep 5", temp.path().display());

        let runner = ToolRunner::new("sh".to_string(), 1);
        let result = runner
            .run(&["-c".to_string(), script], &CancellationToken::new(), |_| {})
            .await;
        assert!(result.is_err());
        assert!(temp.path().exists());

        drop(temp);
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
