// src/exec/middleware.rs

//! Middleware: executor-to-executor transforms.

use std::sync::Arc;

use super::executor::SharedExecutor;

/// A transform wrapping one executor in another.
pub type Middleware = Arc<dyn Fn(SharedExecutor) -> SharedExecutor + Send + Sync>;

/// Turn a closure into a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(SharedExecutor) -> SharedExecutor + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap `exec` in every middleware of the list.
///
/// The **last** middleware ends up outermost: for `[m1, m2]` around `b`,
/// control flows `m2 -> m1 -> b -> m1 -> m2`.
pub fn use_middleware<I>(exec: SharedExecutor, middleware: I) -> SharedExecutor
where
    I: IntoIterator<Item = Middleware>,
{
    middleware.into_iter().fold(exec, |inner, m| m(inner))
}
