use std::collections::BTreeMap;
use std::time::Duration;

use runguard::orchestrator::Signal;
use runguard::Orchestrator;

use crate::probes::{CallLog, Probe};

/// Builder for an orchestrator whose target and hooks are [`Probe`]s
/// writing to one shared [`CallLog`].
///
/// Labels: `"before"`, `"target"`, `"after"`, and `"signal:<SIG>"` for
/// signal handlers.
pub struct OrchestratorFixture {
    log: CallLog,
    target: Probe,
    before: Option<Probe>,
    after: Option<Probe>,
    signals: BTreeMap<Signal, Probe>,
}

impl OrchestratorFixture {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            target: Probe::new("target", &log),
            log,
            before: None,
            after: None,
            signals: BTreeMap::new(),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn target_delay(mut self, delay: Duration) -> Self {
        self.target = self.target.delay(delay);
        self
    }

    pub fn failing_target(mut self, message: &str) -> Self {
        self.target = self.target.fail(message);
        self
    }

    pub fn with_before(mut self) -> Self {
        self.before = Some(Probe::new("before", &self.log));
        self
    }

    pub fn failing_before(mut self, message: &str) -> Self {
        self.before = Some(Probe::new("before", &self.log).fail(message));
        self
    }

    pub fn with_after(mut self) -> Self {
        self.after = Some(Probe::new("after", &self.log));
        self
    }

    pub fn failing_after(mut self, message: &str) -> Self {
        self.after = Some(Probe::new("after", &self.log).fail(message));
        self
    }

    pub fn on_signal(mut self, signal: Signal, failure: Option<&str>) -> Self {
        let mut probe = Probe::new(&format!("signal:{signal}"), &self.log);
        if let Some(message) = failure {
            probe = probe.fail(message);
        }
        self.signals.insert(signal, probe);
        self
    }

    pub fn build(self) -> (Orchestrator, CallLog) {
        let mut builder = Orchestrator::builder(self.target.shared());
        if let Some(before) = self.before {
            builder = builder.before(before.shared());
        }
        if let Some(after) = self.after {
            builder = builder.after(after.shared());
        }
        for (signal, probe) in self.signals {
            builder = builder.on_signal(signal, probe.shared());
        }
        (builder.build(), self.log)
    }
}

impl Default for OrchestratorFixture {
    fn default() -> Self {
        Self::new()
    }
}
