// src/middleware/mod.rs

//! Ready-made executors and middleware.
//!
//! None of these are known to the orchestrator; they are ordinary
//! [`Executor`](crate::exec::Executor)s composed around a target.
//!
//! - [`timeout`]: deadline-bounded execution.
//! - [`recover`]: panic to error conversion.
//! - [`parallel`]: fan-out and bounded-concurrency pools.
//! - [`defer`]: cleanup chains that always run after the inner executor.

pub mod defer;
pub mod parallel;
pub mod recover;
pub mod timeout;

pub use defer::{Defer, defer};
pub use parallel::{Parallel, parallel, pool};
pub use recover::{Recover, recover};
pub use timeout::{Timeout, timeout};
