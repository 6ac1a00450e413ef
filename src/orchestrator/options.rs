// src/orchestrator/options.rs

//! Orchestrator configuration.
//!
//! [`Options`] is plain data: an argument list, optional before/after hooks,
//! and a signal -> handler map. It is filled in once, either through
//! [`OrchestratorBuilder`] or by applying [`Configurator`]s, and never changes
//! while a run is in progress.

use std::collections::BTreeMap;
use std::fmt;

use crate::context::Arg;
use crate::exec::SharedExecutor;

use super::Orchestrator;
use super::signals::Signal;

#[derive(Clone, Default)]
pub struct Options {
    pub(crate) args: Vec<Arg>,
    pub(crate) before: Option<SharedExecutor>,
    pub(crate) after: Option<SharedExecutor>,
    pub(crate) signals: BTreeMap<Signal, SharedExecutor>,
}

impl Options {
    /// Replace the argument list wholesale.
    pub fn set_arguments(&mut self, args: impl IntoIterator<Item = Arg>) {
        self.args = args.into_iter().collect();
    }

    /// Register (or overwrite) the handler for `signal`.
    pub fn set_signal(&mut self, signal: Signal, handler: SharedExecutor) {
        self.signals.insert(signal, handler);
    }

    pub fn set_before(&mut self, hook: SharedExecutor) {
        self.before = Some(hook);
    }

    pub fn set_after(&mut self, hook: SharedExecutor) {
        self.after = Some(hook);
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    pub fn has_before(&self) -> bool {
        self.before.is_some()
    }

    pub fn has_after(&self) -> bool {
        self.after.is_some()
    }

    /// Signals with a registered handler, in a stable order.
    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.keys().copied()
    }

    pub(crate) fn signal_handler(&self, signal: Signal) -> Option<&SharedExecutor> {
        self.signals.get(&signal)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("arguments", &self.args.len())
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("signals", &self.signals.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A single configuration step, applied in order by [`Orchestrator::new`].
pub type Configurator = Box<dyn FnOnce(&mut Options) + Send>;

/// Attach `args` to the run's context.
pub fn with_arguments(args: impl IntoIterator<Item = Arg>) -> Configurator {
    let args: Vec<Arg> = args.into_iter().collect();
    Box::new(move |opts| opts.set_arguments(args))
}

/// Run `handler` whenever `signal` is delivered during a run.
pub fn with_signal(signal: Signal, handler: SharedExecutor) -> Configurator {
    Box::new(move |opts| opts.set_signal(signal, handler))
}

pub fn with_before(hook: SharedExecutor) -> Configurator {
    Box::new(move |opts| opts.set_before(hook))
}

pub fn with_after(hook: SharedExecutor) -> Configurator {
    Box::new(move |opts| opts.set_after(hook))
}

/// Fluent builder for an [`Orchestrator`].
///
/// ```ignore
/// let orch = Orchestrator::builder(target)
///     .before(setup)
///     .after(teardown)
///     .on_signal(Signal::Terminate, graceful)
///     .build();
/// ```
pub struct OrchestratorBuilder {
    target: SharedExecutor,
    options: Options,
}

impl OrchestratorBuilder {
    pub(crate) fn new(target: SharedExecutor) -> Self {
        Self {
            target,
            options: Options::default(),
        }
    }

    pub fn arguments(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.options.set_arguments(args);
        self
    }

    pub fn on_signal(mut self, signal: Signal, handler: SharedExecutor) -> Self {
        self.options.set_signal(signal, handler);
        self
    }

    pub fn before(mut self, hook: SharedExecutor) -> Self {
        self.options.set_before(hook);
        self
    }

    pub fn after(mut self, hook: SharedExecutor) -> Self {
        self.options.set_after(hook);
        self
    }

    /// Apply an arbitrary configurator.
    pub fn with(mut self, configurator: Configurator) -> Self {
        configurator(&mut self.options);
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator::from_options(self.target, self.options)
    }
}
