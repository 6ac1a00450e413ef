// src/middleware/recover.rs

use std::sync::Arc;

use tracing::error;

use crate::context::Context;
use crate::errors::{ExecutorError, Result};
use crate::exec::{ExecFuture, Executor, Middleware, SharedExecutor, middleware};
use crate::orchestrator::tracked::panic_message;

/// Turns a panic in the inner executor into [`ExecutorError::Panicked`].
///
/// The inner executor runs on its own tokio task so the unwind stops there.
pub struct Recover {
    inner: SharedExecutor,
}

impl Recover {
    pub fn new(inner: SharedExecutor) -> Self {
        Self { inner }
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.execute(ctx).await }).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => {
                let message = panic_message(err);
                error!(panic = %message, "executor panicked");
                Err(ExecutorError::Panicked(message))
            }
            Err(_) => Err(ExecutorError::Canceled),
        }
    }
}

impl Executor for Recover {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(ctx))
    }
}

pub fn recover() -> Middleware {
    middleware(|inner: SharedExecutor| Arc::new(Recover::new(inner)) as SharedExecutor)
}
