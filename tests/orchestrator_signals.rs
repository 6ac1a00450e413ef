// tests/orchestrator_signals.rs

//! Real OS signals raised against the test process.
//!
//! Each test uses its own signal number so tests in this binary can run in
//! parallel without stealing each other's deliveries.

#![cfg(unix)]

use std::error::Error;
use std::time::{Duration, Instant};

use runguard::exec::executor_fn;
use runguard::orchestrator::{Signal, SignalSet};
use runguard::{Context, ExecutorError, Orchestrator, arg};
use runguard_test_utils::fixture::OrchestratorFixture;
use runguard_test_utils::probes::{CallLog, Probe, failure_label};
use runguard_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const TARGET_DELAY: Duration = Duration::from_millis(400);

fn raise(signum: libc::c_int) {
    // SAFETY: raising a signal for which a tokio handler is installed.
    let rc = unsafe { libc::raise(signum) };
    assert_eq!(rc, 0, "raise({signum}) failed");
}

/// Raise `signum` once the target has started (the set is subscribed by then).
fn raise_when_started(log: &CallLog, signum: libc::c_int) -> tokio::task::JoinHandle<()> {
    let log = log.clone();
    tokio::spawn(async move {
        log.wait_for("target").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        raise(signum);
    })
}

#[tokio::test]
async fn failing_handler_is_returned_only_after_target_finishes() -> TestResult {
    init_tracing();

    let (orch, log) = OrchestratorFixture::new()
        .with_after()
        .target_delay(TARGET_DELAY)
        .on_signal(Signal::User1, Some("G"))
        .build();

    let started = Instant::now();
    let raiser = raise_when_started(&log, libc::SIGUSR1);
    let err = with_timeout(orch.run(Some(Context::new())))
        .await
        .expect_err("failing handler is terminal");
    raiser.await?;

    assert_eq!(failure_label(&err), Some("G"));
    assert!(started.elapsed() >= TARGET_DELAY, "drain guarantee violated");

    let handler = log.position("signal:SIGUSR1:done").expect("handler ran");
    let target_done = log.position("target:done").expect("target drained");
    let after = log.position("after").expect("after hook ran");
    assert!(handler < target_done);
    assert!(target_done < after);
    Ok(())
}

#[tokio::test]
async fn succeeding_handler_keeps_waiting_for_target() -> TestResult {
    init_tracing();

    let (orch, log) = OrchestratorFixture::new()
        .failing_target("T")
        .target_delay(TARGET_DELAY)
        .on_signal(Signal::User2, None)
        .build();

    let raiser = raise_when_started(&log, libc::SIGUSR2);
    let err = with_timeout(orch.run(Some(Context::new())))
        .await
        .expect_err("target outcome is returned");
    raiser.await?;

    assert_eq!(failure_label(&err), Some("T"));
    assert_eq!(log.count("signal:SIGUSR2:done"), 1);
    assert!(log.position("signal:SIGUSR2") < log.position("target:done"));
    Ok(())
}

#[tokio::test]
async fn handler_sees_arguments_and_can_cancel_the_run() -> TestResult {
    init_tracing();

    let log = CallLog::new();
    let handler_log = log.clone();
    let handler = executor_fn(move |ctx: Context| {
        let log = handler_log.clone();
        async move {
            let label = ctx.argument::<String>(0).cloned().unwrap_or_default();
            log.push(format!("handler:{label}"));
            ctx.cancel();
            Ok(())
        }
    });

    let orch = Orchestrator::builder(Probe::new("target", &log).delay(TARGET_DELAY).shared())
        .arguments([arg("reload".to_string())])
        .on_signal(Signal::Hangup, handler)
        .build();

    let raiser = raise_when_started(&log, libc::SIGHUP);
    let res = with_timeout(orch.run(Some(Context::new()))).await;
    raiser.await?;

    assert!(matches!(res, Err(ExecutorError::Canceled)), "got {res:?}");
    assert_eq!(log.count("handler:reload"), 1);
    assert_eq!(log.count("target:done"), 1);
    Ok(())
}

#[tokio::test]
async fn unsubscribable_signal_fails_without_running_target() {
    init_tracing();

    let (orch, log) = OrchestratorFixture::new()
        .with_after()
        .on_signal(Signal::Raw(libc::SIGKILL), None)
        .build();

    let res = with_timeout(orch.run(Some(Context::new()))).await;

    match res {
        Err(ExecutorError::SignalSubscribe { signal, .. }) => {
            assert_eq!(signal, Signal::Raw(libc::SIGKILL));
        }
        other => panic!("expected SignalSubscribe, got {other:?}"),
    }
    assert_eq!(log.count("target"), 0);
    assert_eq!(log.count("after:done"), 1);
    assert!(!orch.is_running());
}

#[tokio::test]
async fn signal_set_reports_the_delivered_signal() -> TestResult {
    init_tracing();

    let mut set = SignalSet::subscribe([Signal::WindowChange])?;
    assert_eq!(set.signals().collect::<Vec<_>>(), vec![Signal::WindowChange]);

    raise(libc::SIGWINCH);
    let got = with_timeout(set.recv()).await;

    assert_eq!(got, Signal::WindowChange);
    Ok(())
}

#[tokio::test]
async fn empty_signal_set_never_fires() -> TestResult {
    let mut set = SignalSet::subscribe(std::iter::empty())?;
    assert!(set.is_empty());

    let res = tokio::time::timeout(Duration::from_millis(50), set.recv()).await;
    assert!(res.is_err());
    Ok(())
}

#[test]
fn signal_names_parse() {
    assert_eq!("INT".parse::<Signal>(), Ok(Signal::Interrupt));
    assert_eq!("sigterm".parse::<Signal>(), Ok(Signal::Terminate));
    assert_eq!("SIGUSR1".parse::<Signal>(), Ok(Signal::User1));
    assert_eq!("34".parse::<Signal>(), Ok(Signal::Raw(34)));
    assert!("nope".parse::<Signal>().is_err());
    assert_eq!(Signal::Hangup.to_string(), "SIGHUP");
}
