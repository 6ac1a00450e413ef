// src/exec/executor.rs

//! The executor capability.
//!
//! Everything the orchestrator runs (the target, hooks, signal handlers) is an
//! [`Executor`]. The orchestrator only ever talks to this trait, so test
//! doubles, shell commands and middleware stacks are interchangeable.
//!
//! - [`ExecutorFn`] adapts a plain async function/closure.
//! - `Arc<E>` and `Box<E>` forward to the wrapped executor, which lets
//!   [`SharedExecutor`] (`Arc<dyn Executor>`) be passed around freely.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::errors::Result;

/// Boxed future returned by [`Executor::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Reference-counted, type-erased executor.
pub type SharedExecutor = Arc<dyn Executor>;

/// A single unit of work.
///
/// Implementations should observe `ctx` for cancellation; nothing forces
/// them to stop. The returned failure is handed to the caller verbatim.
pub trait Executor: Send + Sync {
    fn execute(&self, ctx: Context) -> ExecFuture<'_>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        (**self).execute(ctx)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        (**self).execute(ctx)
    }
}

/// Adapter turning an async function into an [`Executor`].
#[derive(Clone)]
pub struct ExecutorFn<F> {
    f: F,
}

impl<F, Fut> ExecutorFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Executor for ExecutorFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn execute(&self, ctx: Context) -> ExecFuture<'_> {
        Box::pin((self.f)(ctx))
    }
}

impl<F> fmt::Debug for ExecutorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorFn").finish_non_exhaustive()
    }
}

/// Shorthand for `Arc::new(ExecutorFn::new(f))`.
pub fn executor_fn<F, Fut>(f: F) -> SharedExecutor
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(ExecutorFn::new(f))
}
