// src/exec/command.rs

//! Shell command executor.

use std::process::Stdio;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::errors::{ExecutorError, Result};

use super::executor::{ExecFuture, Executor};

/// Runs a shell command as one unit of work.
///
/// - stdout lines are logged at `info`, stderr lines at `debug`.
/// - If the context is cancelled first, the child is killed and the
///   context's cancellation reason is returned.
/// - A non-zero exit status becomes [`ExecutorError::Command`].
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    name: String,
    cmd: String,
}

impl CommandExecutor {
    pub fn new(cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        Self {
            name: cmd.clone(),
            cmd,
        }
    }

    /// Label used in log lines instead of the raw command.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        info!(name = %self.name, cmd = %self.cmd, "starting command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for '{}'", self.name))?;

        if let Some(stdout) = child.stdout.take() {
            let name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(name = %name, "stdout: {}", line);
                }
            });
        }

        // Always consume stderr so buffers don't fill.
        if let Some(stderr) = child.stderr.take() {
            let name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(name = %name, "stderr: {}", line);
                }
            });
        }

        tokio::select! {
            status_res = child.wait() => {
                let status = status_res
                    .with_context(|| format!("waiting for process of '{}'", self.name))?;
                let code = status.code().unwrap_or(-1);

                info!(
                    name = %self.name,
                    exit_code = code,
                    success = status.success(),
                    "command exited"
                );

                if status.success() {
                    Ok(())
                } else {
                    Err(ExecutorError::Command(format!(
                        "'{}' exited with status {code}",
                        self.name
                    )))
                }
            }

            _ = ctx.cancelled() => {
                info!(name = %self.name, "context cancelled; killing process");
                if let Err(e) = child.kill().await {
                    warn!(name = %self.name, error = %e, "failed to kill child process");
                }
                Err(ctx.err().unwrap_or(ExecutorError::Canceled))
            }
        }
    }
}

impl Executor for CommandExecutor {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(ctx))
    }
}
