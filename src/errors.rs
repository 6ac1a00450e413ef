// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Failures produced by user executors travel through [`ExecutorError::Other`]
//! untouched, so callers can still downcast to their own error types.

use thiserror::Error;

use crate::orchestrator::Signal;

#[derive(Error, Debug)]
pub enum ExecutorError {
    /// `run` was invoked without an execution context.
    #[error("context required")]
    ContextRequired,

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The executor panicked while running on its own task.
    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("failed to subscribe to signal {signal}: {source}")]
    SignalSubscribe {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },

    /// A supervised command exited unsuccessfully.
    #[error("command failed: {0}")]
    Command(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutorError {
    /// Wrap any error value as a pass-through failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(anyhow::Error::new(err))
    }

    /// True for the two context-cancellation reasons.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
