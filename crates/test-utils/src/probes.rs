use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runguard::exec::{ExecFuture, Executor, SharedExecutor};
use runguard::{Context, ExecutorError};

/// Shared, ordered log of labelled events.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// How many times `entry` was recorded.
    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    /// Poll until `entry` has been recorded; panics after 2 seconds.
    pub async fn wait_for(&self, entry: &str) {
        for _ in 0..400 {
            if self.position(entry).is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("'{entry}' was never recorded; log = {:?}", self.entries());
    }

    /// Index of the first occurrence of `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// Failure value produced by probes; keeps the label it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure(pub String);

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe failure: {}", self.0)
    }
}

impl std::error::Error for ProbeFailure {}

/// Recover the `ProbeFailure` label carried by an error, if any.
pub fn failure_label(err: &ExecutorError) -> Option<&str> {
    match err {
        ExecutorError::Other(inner) => inner
            .downcast_ref::<ProbeFailure>()
            .map(|f| f.0.as_str()),
        _ => None,
    }
}

/// A scriptable executor.
///
/// Records `"<label>"` when it starts and `"<label>:done"` when it returns,
/// optionally sleeping in between, then succeeds, fails or panics.
#[derive(Clone)]
pub struct Probe {
    label: String,
    log: CallLog,
    delay: Option<Duration>,
    failure: Option<String>,
    panics: bool,
}

impl Probe {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            delay: None,
            failure: None,
            panics: false,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn panics(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn shared(self) -> SharedExecutor {
        Arc::new(self)
    }
}

impl Executor for Probe {
    fn execute(&self, _ctx: Context) -> ExecFuture<'_> {
        Box::pin(async move {
            self.log.push(self.label.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.panics {
                panic!("{} panicked", self.label);
            }
            self.log.push(format!("{}:done", self.label));
            match &self.failure {
                Some(message) => Err(ExecutorError::other(ProbeFailure(message.clone()))),
                None => Ok(()),
            }
        })
    }
}
