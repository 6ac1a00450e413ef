// src/context.rs

//! Execution context handed to every executor.
//!
//! A [`Context`] couples two things:
//! - a cooperative cancellation scope (backed by a `CancellationToken`),
//!   which remembers *why* it was cancelled, and
//! - an immutable list of opaque arguments attached by the orchestrator.
//!
//! Cloning a context is cheap; clones share the same scope and arguments.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::errors::ExecutorError;

/// One opaque argument attached to a context.
pub type Arg = Arc<dyn Any + Send + Sync>;

/// Wrap a value so it can be attached to a context.
pub fn arg<T: Any + Send + Sync>(value: T) -> Arg {
    Arc::new(value)
}

/// Why a cancellation scope fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl From<CancelReason> for ExecutorError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Canceled => ExecutorError::Canceled,
            CancelReason::DeadlineExceeded => ExecutorError::DeadlineExceeded,
        }
    }
}

struct Scope {
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn root() -> Arc<Self> {
        Arc::new(Self {
            token: CancellationToken::new(),
            reason: OnceLock::new(),
            parent: None,
        })
    }

    fn child_of(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Self {
            token: parent.token.child_token(),
            reason: OnceLock::new(),
            parent: Some(Arc::clone(parent)),
        })
    }

    fn cancel(&self, reason: CancelReason) {
        // First reason wins; later cancels only re-fire the token.
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Reason of the nearest scope (self or ancestor) that was cancelled.
    fn reason(&self) -> Option<CancelReason> {
        if !self.token.is_cancelled() {
            return None;
        }
        if let Some(reason) = self.reason.get() {
            return Some(*reason);
        }
        self.parent
            .as_ref()
            .and_then(|p| p.reason())
            .or(Some(CancelReason::Canceled))
    }
}

#[derive(Clone)]
pub struct Context {
    scope: Arc<Scope>,
    args: Arc<[Arg]>,
}

impl Context {
    /// A fresh root context: not cancelled, no arguments.
    pub fn new() -> Self {
        Self {
            scope: Scope::root(),
            args: Arc::from(Vec::new()),
        }
    }

    /// Derive a context that is cancelled together with `self` but can also
    /// be cancelled on its own. Arguments are inherited.
    pub fn child(&self) -> Self {
        Self {
            scope: Scope::child_of(&self.scope),
            args: Arc::clone(&self.args),
        }
    }

    /// Same cancellation scope, replaced argument list.
    pub fn with_arguments(&self, args: impl IntoIterator<Item = Arg>) -> Self {
        Self {
            scope: Arc::clone(&self.scope),
            args: args.into_iter().collect(),
        }
    }

    /// Cancel this scope and every context derived from it.
    pub fn cancel(&self) {
        self.scope.cancel(CancelReason::Canceled);
    }

    pub(crate) fn expire(&self) {
        self.scope.cancel(CancelReason::DeadlineExceeded);
    }

    pub fn is_cancelled(&self) -> bool {
        self.scope.token.is_cancelled()
    }

    /// Resolves once this context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.scope.token.cancelled()
    }

    /// `None` while live; the cancellation reason afterwards.
    pub fn reason(&self) -> Option<CancelReason> {
        self.scope.reason()
    }

    /// The cancellation reason as an error, if cancelled.
    pub fn err(&self) -> Option<ExecutorError> {
        self.reason().map(ExecutorError::from)
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    /// Typed view of the argument at `index`.
    ///
    /// Returns `None` if the index is out of range or the value has a
    /// different type.
    pub fn argument<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index).and_then(|a| a.downcast_ref::<T>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .field("arguments", &self.args.len())
            .finish()
    }
}
