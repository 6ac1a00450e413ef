// src/orchestrator/mod.rs

//! Run one executor with lifecycle hooks, signal routing and cooperative
//! shutdown.
//!
//! A run goes through these steps:
//! 1. the before-hook runs on the caller's task; a failure ends the run
//!    immediately (no target, no after-hook);
//! 2. configured arguments are attached to the context;
//! 3. the signals that have handlers are subscribed ([`SignalSet`]);
//! 4. the target is spawned as a [`TrackedTask`];
//! 5. the loop waits on target completion, signals, [`Orchestrator::stop`]
//!    and context cancellation, whichever is ready first;
//! 6. the tracked task is **always** drained, then the after-hook runs, and
//!    only then does `run` return the outcome from step 5.
//!
//! Stop, cancellation and failing signal handlers never interrupt the
//! target; they only decide what `run` reports once the target is done.

pub mod options;
pub mod signals;
pub mod tracked;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::errors::{ExecutorError, Result};
use crate::exec::{ExecFuture, Executor, SharedExecutor};

pub use options::{
    Configurator, Options, OrchestratorBuilder, with_after, with_arguments, with_before,
    with_signal,
};
pub use signals::{ParseSignalError, Signal, SignalSet};
pub use tracked::TrackedTask;

/// Runs a target executor under the configured [`Options`].
pub struct Orchestrator {
    options: Options,
    target: SharedExecutor,
    marker: Arc<Mutex<RunMarker>>,
    propagate_after_error: bool,
}

/// Non-empty `active` means a run is in progress.
#[derive(Debug, Default)]
struct RunMarker {
    next_id: u64,
    active: Option<ActiveRun>,
}

#[derive(Debug)]
struct ActiveRun {
    id: u64,
    stop_tx: oneshot::Sender<()>,
}

fn lock(marker: &Mutex<RunMarker>) -> MutexGuard<'_, RunMarker> {
    marker.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunMarker {
    /// Enter the running state, unless a run is already active.
    fn begin(&mut self) -> Option<(u64, oneshot::Receiver<()>)> {
        if self.active.is_some() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        let (stop_tx, stop_rx) = oneshot::channel();
        self.active = Some(ActiveRun { id, stop_tx });
        Some((id, stop_rx))
    }

    /// Back to idle, signalling the loop. No-op when idle.
    fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(run) => {
                // The loop may already be gone; the marker is reset either way.
                let _ = run.stop_tx.send(());
                true
            }
            None => false,
        }
    }
}

/// Clears the marker when the run that set it returns, leaving any newer
/// run alone.
struct RunGuard<'a> {
    marker: &'a Mutex<RunMarker>,
    id: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut marker = lock(self.marker);
        if marker.active.as_ref().is_some_and(|run| run.id == self.id) {
            marker.active = None;
        }
    }
}

/// Cloneable handle requesting a cooperative stop from another task.
#[derive(Clone)]
pub struct StopHandle {
    marker: Arc<Mutex<RunMarker>>,
}

impl StopHandle {
    /// See [`Orchestrator::stop`].
    pub fn stop(&self) {
        if lock(&self.marker).stop() {
            info!("stop requested");
        } else {
            debug!("stop requested while idle; ignoring");
        }
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle").finish_non_exhaustive()
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("running", &self.is_running())
            .field("propagate_after_error", &self.propagate_after_error)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Build an orchestrator, applying `configurators` in order.
    pub fn new<I>(target: SharedExecutor, configurators: I) -> Self
    where
        I: IntoIterator<Item = Configurator>,
    {
        let mut options = Options::default();
        for configure in configurators {
            configure(&mut options);
        }
        Self::from_options(target, options)
    }

    pub fn builder(target: SharedExecutor) -> OrchestratorBuilder {
        OrchestratorBuilder::new(target)
    }

    pub(crate) fn from_options(target: SharedExecutor, options: Options) -> Self {
        Self {
            options,
            target,
            marker: Arc::new(Mutex::new(RunMarker::default())),
            propagate_after_error: false,
        }
    }

    /// Report after-hook failures from `run` when the run itself succeeded.
    ///
    /// Off by default: an after-hook failure is logged and discarded.
    pub fn propagate_after_error(mut self, propagate: bool) -> Self {
        self.propagate_after_error = propagate;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        lock(&self.marker).active.is_some()
    }

    /// Ask an active run to finish with success.
    ///
    /// Cooperative: the target keeps running and `run` still waits for it
    /// and for the after-hook. Idle orchestrators ignore the request, and a
    /// second stop in a row is a no-op.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            marker: Arc::clone(&self.marker),
        }
    }

    /// Run the target to a terminal outcome.
    ///
    /// - `None` context: [`ExecutorError::ContextRequired`], nothing runs.
    /// - already running: returns `Ok(())` immediately without side effects.
    ///
    /// If this future is dropped mid-run, the target task is detached and
    /// the after-hook does not run.
    pub async fn run(&self, ctx: Option<Context>) -> Result<()> {
        let Some(ctx) = ctx else {
            return Err(ExecutorError::ContextRequired);
        };

        let Some((id, stop_rx)) = lock(&self.marker).begin() else {
            debug!("orchestrator already running; ignoring run request");
            return Ok(());
        };
        let _guard = RunGuard {
            marker: &self.marker,
            id,
        };

        debug!(run_id = id, "run started");

        if let Some(before) = &self.options.before {
            if let Err(err) = before.execute(ctx.clone()).await {
                info!(run_id = id, error = %err, "before hook failed; aborting run");
                return Err(err);
            }
        }

        let ctx = if self.options.args.is_empty() {
            ctx
        } else {
            ctx.with_arguments(self.options.args.iter().cloned())
        };

        let outcome = self.supervise(id, &ctx, stop_rx).await;
        let after = self.run_after(id, &ctx).await;

        match (outcome, after) {
            (Ok(()), Err(err)) if self.propagate_after_error => Err(err),
            (outcome, _) => {
                match &outcome {
                    Ok(()) => info!(run_id = id, "run finished"),
                    Err(err) => info!(run_id = id, error = %err, "run finished with error"),
                }
                outcome
            }
        }
    }

    /// Steps 3-5 plus the drain. Returns the first terminal outcome.
    async fn supervise(
        &self,
        id: u64,
        ctx: &Context,
        mut stop_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        let mut signals = SignalSet::subscribe(self.options.signals())?;
        if !signals.is_empty() {
            debug!(run_id = id, signals = ?signals.signals().collect::<Vec<_>>(), "subscribed to signals");
        }

        let mut task = TrackedTask::spawn(Arc::clone(&self.target), ctx.clone());

        let outcome = loop {
            tokio::select! {
                outcome = task.join() => {
                    debug!(run_id = id, "target finished");
                    break outcome;
                }

                signal = signals.recv() => {
                    let Some(handler) = self.options.signal_handler(signal) else {
                        debug!(run_id = id, %signal, "no handler for signal; ignoring");
                        continue;
                    };
                    info!(run_id = id, %signal, "signal received; running handler");
                    if let Err(err) = handler.execute(ctx.clone()).await {
                        warn!(run_id = id, %signal, error = %err, "signal handler failed");
                        break Err(err);
                    }
                }

                _ = &mut stop_rx => {
                    debug!(run_id = id, "stop observed");
                    break Ok(());
                }

                _ = ctx.cancelled() => {
                    debug!(run_id = id, "context cancelled");
                    break Err(ctx.err().unwrap_or(ExecutorError::Canceled));
                }
            }
        };

        drop(signals);

        if !task.is_finished() {
            debug!(run_id = id, "waiting for target before after hook");
        }
        task.drain().await;

        outcome
    }

    async fn run_after(&self, id: u64, ctx: &Context) -> Result<()> {
        let Some(after) = &self.options.after else {
            return Ok(());
        };
        let res = after.execute(ctx.clone()).await;
        if let Err(err) = &res {
            if self.propagate_after_error {
                warn!(run_id = id, error = %err, "after hook failed");
            } else {
                warn!(run_id = id, error = %err, "after hook failed; error discarded");
            }
        }
        res
    }
}

impl Executor for Orchestrator {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin(self.run(Some(ctx)))
    }
}
