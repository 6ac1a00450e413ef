// src/middleware/defer.rs

use std::sync::Arc;

use tracing::warn;

use crate::context::Context;
use crate::errors::Result;
use crate::exec::{ExecFuture, Executor, Middleware, SharedExecutor, middleware};

/// Runs cleanups after the inner executor, whatever its outcome.
///
/// Cleanups run last-registered-first. The inner failure wins; otherwise the
/// first cleanup failure (in run order) is returned.
pub struct Defer {
    inner: SharedExecutor,
    cleanups: Vec<SharedExecutor>,
}

impl Defer {
    pub fn new(inner: SharedExecutor) -> Self {
        Self {
            inner,
            cleanups: Vec::new(),
        }
    }

    pub fn then(mut self, cleanup: SharedExecutor) -> Self {
        self.cleanups.push(cleanup);
        self
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        let outcome = self.inner.execute(ctx.clone()).await;

        let mut cleanup_err = None;
        for cleanup in self.cleanups.iter().rev() {
            if let Err(err) = cleanup.execute(ctx.clone()).await {
                warn!(error = %err, "deferred cleanup failed");
                cleanup_err.get_or_insert(err);
            }
        }

        match (outcome, cleanup_err) {
            (Err(err), _) => Err(err),
            (Ok(()), Some(err)) => Err(err),
            (Ok(()), None) => Ok(()),
        }
    }
}

impl Executor for Defer {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(ctx))
    }
}

/// Middleware form: run `cleanup` after whatever it wraps.
///
/// Stacking `[defer(a), defer(b)]` runs `a` before `b`, since `b` is the
/// outer layer.
pub fn defer(cleanup: SharedExecutor) -> Middleware {
    middleware(move |inner: SharedExecutor| {
        Arc::new(Defer::new(inner).then(Arc::clone(&cleanup))) as SharedExecutor
    })
}
