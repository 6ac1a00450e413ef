// src/middleware/parallel.rs

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::context::Context;
use crate::errors::{ExecutorError, Result};
use crate::exec::{ExecFuture, Executor, SharedExecutor};
use crate::orchestrator::tracked::panic_message;

/// Fan-out over several executors.
///
/// Every executor gets a child of the caller's context. The first failure
/// cancels that shared child (siblings are expected to notice) and is the
/// value returned once all executors have finished. With a limit set, at
/// most `limit` executors run at the same time; queued ones that have not
/// started when the group is cancelled are skipped.
pub struct Parallel {
    execs: Vec<SharedExecutor>,
    limit: Option<usize>,
}

impl Parallel {
    pub fn new(execs: impl IntoIterator<Item = SharedExecutor>) -> Self {
        Self {
            execs: execs.into_iter().collect(),
            limit: None,
        }
    }

    /// Bound concurrency. A limit of 0 is treated as 1.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        let group = ctx.child();
        let permits = self.limit.map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();

        for exec in &self.execs {
            let exec = Arc::clone(exec);
            let ctx = group.clone();
            let permits = permits.clone();
            set.spawn(async move {
                let _permit = match permits {
                    Some(sem) => tokio::select! {
                        permit = sem.acquire_owned() => permit.ok(),
                        _ = ctx.cancelled() => {
                            return Err(ctx.err().unwrap_or(ExecutorError::Canceled));
                        }
                    },
                    None => None,
                };
                exec.execute(ctx).await
            });
        }

        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => Err(ExecutorError::Panicked(panic_message(err))),
                Err(_) => Err(ExecutorError::Canceled),
            };
            if let Err(err) = outcome {
                if first_err.is_none() {
                    debug!(error = %err, "parallel member failed; cancelling group");
                    group.cancel();
                    first_err = Some(err);
                } else {
                    debug!(error = %err, "additional parallel member failure");
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Executor for Parallel {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(ctx))
    }
}

/// Run all `execs` concurrently.
pub fn parallel(execs: impl IntoIterator<Item = SharedExecutor>) -> SharedExecutor {
    Arc::new(Parallel::new(execs))
}

/// Run `execs` with at most `size` in flight.
pub fn pool(size: usize, execs: impl IntoIterator<Item = SharedExecutor>) -> SharedExecutor {
    Arc::new(Parallel::new(execs).limit(size))
}
