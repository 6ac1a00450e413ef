// src/middleware/timeout.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::context::Context;
use crate::errors::Result;
use crate::exec::{ExecFuture, Executor, Middleware, SharedExecutor, middleware};

/// Runs the inner executor with a deadline.
///
/// When the deadline passes, the inner executor's context is cancelled with
/// [`DeadlineExceeded`](crate::errors::ExecutorError::DeadlineExceeded) and
/// the inner executor is still awaited; whatever it returns is the outcome.
pub struct Timeout {
    duration: Duration,
    inner: SharedExecutor,
}

impl Timeout {
    pub fn new(duration: Duration, inner: SharedExecutor) -> Self {
        Self { duration, inner }
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        let child = ctx.child();
        let mut fut = self.inner.execute(child.clone());

        tokio::select! {
            res = &mut fut => res,
            _ = tokio::time::sleep(self.duration) => {
                debug!(timeout = ?self.duration, "deadline exceeded; cancelling inner executor");
                child.expire();
                fut.await
            }
        }
    }
}

impl Executor for Timeout {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(ctx))
    }
}

/// Middleware form of [`Timeout`].
pub fn timeout(duration: Duration) -> Middleware {
    middleware(move |inner: SharedExecutor| {
        Arc::new(Timeout::new(duration, inner)) as SharedExecutor
    })
}
