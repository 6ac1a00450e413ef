// src/exec/mod.rs

//! Executor capability and its building blocks.
//!
//! - [`executor`] defines the `Executor` trait, the function adapter and the
//!   shared/boxed forwarding impls.
//! - [`middleware`] defines the `Middleware` transform and
//!   [`use_middleware`] composition.
//! - [`command`] provides `CommandExecutor`, which runs a shell command and
//!   kills it when its context is cancelled.

pub mod command;
pub mod executor;
pub mod middleware;

pub use command::CommandExecutor;
pub use executor::{ExecFuture, Executor, ExecutorFn, SharedExecutor, executor_fn};
pub use middleware::{Middleware, middleware, use_middleware};
