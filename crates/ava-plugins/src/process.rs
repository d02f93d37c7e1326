//! Child-process plumbing shared by the plugin runtimes.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PluginError, Result};

/// Captured result of one plugin process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Process exit code (-1 when killed by a signal).
    pub exit_code: i32,
    /// Raw bytes; only a successful run's stdout is decoded.
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout on a zero exit code, `PluginError::Failed` otherwise.
    ///
    /// Stdout must be valid UTF-8; it is never repaired.
    pub fn into_reply(self) -> Result<String> {
        if self.exit_code == 0 {
            String::from_utf8(self.stdout)
                .map_err(|e| PluginError::InvalidOutput(e.to_string()))
        } else {
            Err(PluginError::Failed {
                exit_code: self.exit_code,
                stderr: self.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Spawn `command`, feed `input` on stdin, and collect its output.
///
/// Stdin is written from a separate task so a plugin that produces output
/// before reading its input cannot deadlock against us. When `timeout`
/// expires the child is killed (`kill_on_drop`) and `Timeout` is returned.
pub async fn run_with_input(
    mut command: Command,
    input: &str,
    timeout: Option<Duration>,
) -> Result<ProcessOutput> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PluginError::Spawn(format!("spawn failed: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_owned();
        tokio::spawn(async move {
            // A plugin may exit without reading its input; broken pipe is fine.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!(error = %e, "plugin did not consume stdin");
            }
        });
    }

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_elapsed| PluginError::Timeout {
                ms: limit.as_millis() as u64,
            })??,
        None => child.wait_with_output().await?,
    };

    Ok(ProcessOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
