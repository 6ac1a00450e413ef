// src/lib.rs

pub mod cli;
pub mod context;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod middleware;
pub mod orchestrator;

use std::sync::Arc;

use tracing::info;

use crate::cli::CliArgs;
use crate::exec::{CommandExecutor, SharedExecutor, executor_fn, use_middleware};
use crate::middleware::timeout;
use crate::orchestrator::Signal;

pub use crate::context::{Arg, CancelReason, Context, arg};
pub use crate::errors::{ExecutorError, Result};
pub use crate::exec::{Executor, ExecutorFn, Middleware};
pub use crate::orchestrator::{
    Configurator, Orchestrator, StopHandle, with_after, with_arguments, with_before, with_signal,
};

/// Build an orchestrator around `target` and run it once.
pub async fn execute<I>(ctx: Option<Context>, target: SharedExecutor, configurators: I) -> Result<()>
where
    I: IntoIterator<Item = Configurator>,
{
    Orchestrator::new(target, configurators).run(ctx).await
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&args);
    info!(command = %args.command_line(), "supervising command");
    orchestrator.run(Some(Context::new())).await?;
    Ok(())
}

/// Translate CLI arguments into an orchestrator.
///
/// - the command (optionally bounded by `--timeout`) is the target;
/// - `--before` / `--after` become hooks;
/// - `--on-signal` entries become handlers; INT and TERM fall back to
///   interrupting the command only. The run context stays live, so the
///   after command still runs once the command is gone.
pub fn build_orchestrator(args: &CliArgs) -> Orchestrator {
    let shutdown = Context::new();

    let mut target: SharedExecutor =
        Arc::new(CommandExecutor::new(args.command_line()).named("main"));
    if let Some(limit) = args.timeout {
        target = use_middleware(target, [timeout(limit)]);
    }
    let target = interruptible(target, shutdown.clone());

    let mut builder = Orchestrator::builder(target)
        .on_signal(Signal::Interrupt, interrupt(shutdown.clone()))
        .on_signal(Signal::Terminate, interrupt(shutdown));

    if let Some(cmd) = &args.before {
        builder = builder.before(Arc::new(CommandExecutor::new(cmd.as_str()).named("before")));
    }
    if let Some(cmd) = &args.after {
        builder = builder.after(Arc::new(CommandExecutor::new(cmd.as_str()).named("after")));
    }
    for handler in &args.on_signal {
        let name = handler.signal.to_string();
        builder = builder.on_signal(
            handler.signal,
            Arc::new(CommandExecutor::new(handler.cmd.as_str()).named(name)),
        );
    }

    builder.build().propagate_after_error(args.strict_after)
}

/// Run `inner` in a child scope that is also cancelled once `shutdown` is.
fn interruptible(inner: SharedExecutor, shutdown: Context) -> SharedExecutor {
    executor_fn(move |ctx: Context| {
        let inner = Arc::clone(&inner);
        let shutdown = shutdown.clone();
        async move {
            let scope = ctx.child();
            let run = inner.execute(scope.clone());
            tokio::pin!(run);

            tokio::select! {
                res = &mut run => res,
                _ = shutdown.cancelled() => {
                    scope.cancel();
                    run.await
                }
            }
        }
    })
}

fn interrupt(shutdown: Context) -> SharedExecutor {
    executor_fn(move |_ctx: Context| {
        let shutdown = shutdown.clone();
        async move {
            info!("shutdown signal received; interrupting command");
            shutdown.cancel();
            Ok(())
        }
    })
}
