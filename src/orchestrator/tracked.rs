// src/orchestrator/tracked.rs

//! Handle for the one unit of work spawned per run.

use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use crate::context::Context;
use crate::errors::{ExecutorError, Result};
use crate::exec::SharedExecutor;

/// The target executor running on its own tokio task.
///
/// Leaving the multiplexing loop early does not stop the task; the owner
/// decides whether to [`join`](Self::join) (drain) it or [`abort`](Self::abort)
/// it. Dropping the handle detaches the task.
#[derive(Debug)]
pub struct TrackedTask {
    handle: Option<JoinHandle<Result<()>>>,
}

impl TrackedTask {
    pub fn spawn(exec: SharedExecutor, ctx: Context) -> Self {
        let handle = tokio::spawn(async move { exec.execute(ctx).await });
        Self {
            handle: Some(handle),
        }
    }

    /// True once the task has finished (or its outcome was already taken).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the task's outcome.
    ///
    /// Cancel-safe: dropping the future keeps the task tracked. After the
    /// outcome has been returned once, later calls resolve to `Ok(())`.
    pub async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        self.handle = None;
        flatten(joined)
    }

    /// Block until the task is done, discarding its outcome.
    pub async fn drain(mut self) {
        if self.handle.is_some() {
            debug!("draining tracked unit of work");
            let _ = self.join().await;
        }
    }

    /// Request the tokio task be aborted at its next await point.
    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => Err(ExecutorError::Panicked(panic_message(err))),
        Err(_) => Err(ExecutorError::Canceled),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&'static str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "non-string panic payload".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}
