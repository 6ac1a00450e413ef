// tests/middleware_builtin.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use runguard::exec::{Executor, SharedExecutor, executor_fn, use_middleware};
use runguard::middleware::{Defer, defer, parallel, pool, recover, timeout};
use runguard::{Context, ExecutorError, Orchestrator};
use runguard_test_utils::probes::{CallLog, Probe, failure_label};
use runguard_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Waits for cancellation and reports the context's reason.
fn cooperative(log: &CallLog, label: &'static str) -> SharedExecutor {
    let log = log.clone();
    executor_fn(move |ctx: Context| {
        let log = log.clone();
        async move {
            log.push(label);
            ctx.cancelled().await;
            log.push(format!("{label}:cancelled"));
            Err(ctx.err().unwrap_or(ExecutorError::Canceled))
        }
    })
}

#[tokio::test]
async fn timeout_cancels_inner_with_deadline_reason() {
    init_tracing();

    let log = CallLog::new();
    let bounded = use_middleware(
        cooperative(&log, "worker"),
        [timeout(Duration::from_millis(50))],
    );

    let res = with_timeout(bounded.execute(Context::new())).await;

    assert!(matches!(res, Err(ExecutorError::DeadlineExceeded)), "got {res:?}");
    assert_eq!(log.entries(), vec!["worker", "worker:cancelled"]);
}

#[tokio::test]
async fn timeout_leaves_fast_executor_alone() -> TestResult {
    let log = CallLog::new();
    let bounded = use_middleware(
        Probe::new("fast", &log).shared(),
        [timeout(Duration::from_secs(2))],
    );

    bounded.execute(Context::new()).await?;
    assert_eq!(log.count("fast:done"), 1);
    Ok(())
}

#[tokio::test]
async fn timeout_does_not_cancel_the_caller_context() -> TestResult {
    let log = CallLog::new();
    let bounded = use_middleware(
        cooperative(&log, "worker"),
        [timeout(Duration::from_millis(20))],
    );

    let ctx = Context::new();
    let _ = bounded.execute(ctx.clone()).await;

    assert!(!ctx.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn orchestrator_reports_timeout_from_bounded_target() {
    init_tracing();

    let log = CallLog::new();
    let target = use_middleware(
        cooperative(&log, "target"),
        [timeout(Duration::from_millis(50))],
    );
    let orch = Orchestrator::builder(target)
        .after(Probe::new("after", &log).shared())
        .build();

    let res = with_timeout(orch.run(Some(Context::new()))).await;

    assert!(matches!(res, Err(ExecutorError::DeadlineExceeded)));
    assert_eq!(log.entries(), vec!["target", "target:cancelled", "after", "after:done"]);
}

#[tokio::test]
async fn recover_turns_panic_into_error() {
    init_tracing();

    let log = CallLog::new();
    let safe = use_middleware(Probe::new("risky", &log).panics().shared(), [recover()]);

    let res = safe.execute(Context::new()).await;

    match res {
        Err(ExecutorError::Panicked(msg)) => assert!(msg.contains("risky panicked")),
        other => panic!("expected Panicked, got {other:?}"),
    }
}

#[tokio::test]
async fn recover_passes_normal_outcomes_through() {
    let log = CallLog::new();
    let safe = use_middleware(Probe::new("plain", &log).fail("nope").shared(), [recover()]);

    let err = safe.execute(Context::new()).await.unwrap_err();
    assert_eq!(failure_label(&err), Some("nope"));
}

#[tokio::test]
async fn parallel_runs_everything_and_waits() -> TestResult {
    init_tracing();

    let log = CallLog::new();
    let group = parallel(
        (0..4).map(|i| Probe::new(&format!("p{i}"), &log).delay(Duration::from_millis(30)).shared()),
    );

    with_timeout(group.execute(Context::new())).await?;

    for i in 0..4 {
        assert_eq!(log.count(&format!("p{i}:done")), 1);
    }
    Ok(())
}

#[tokio::test]
async fn parallel_failure_cancels_siblings() {
    init_tracing();

    let log = CallLog::new();
    let group = parallel([
        cooperative(&log, "sibling"),
        Probe::new("bad", &log).fail("first").shared(),
    ]);

    let err = with_timeout(group.execute(Context::new())).await.unwrap_err();

    assert_eq!(failure_label(&err), Some("first"));
    assert_eq!(log.count("sibling:cancelled"), 1);
}

#[tokio::test]
async fn pool_bounds_concurrency() -> TestResult {
    init_tracing();

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let jobs: Vec<SharedExecutor> = (0..8)
        .map(|_| {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            executor_fn(move |_ctx: Context| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        })
        .collect();

    with_timeout(pool(3, jobs).execute(Context::new())).await?;

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    assert_eq!(current.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn pool_returns_first_failure() {
    init_tracing();

    let log = CallLog::new();
    let jobs = vec![
        Probe::new("bad", &log).fail("stop").shared(),
        Probe::new("queued", &log).shared(),
    ];

    let err = with_timeout(pool(1, jobs).execute(Context::new()))
        .await
        .unwrap_err();

    assert_eq!(failure_label(&err), Some("stop"));
}

#[tokio::test]
async fn defer_runs_cleanups_in_reverse_even_on_failure() {
    let log = CallLog::new();
    let chain = Defer::new(Probe::new("work", &log).fail("work-failed").shared())
        .then(Probe::new("close-db", &log).shared())
        .then(Probe::new("flush-log", &log).fail("flush-failed").shared());

    let err = chain.execute(Context::new()).await.unwrap_err();

    assert_eq!(failure_label(&err), Some("work-failed"));
    assert_eq!(
        log.entries(),
        vec!["work", "work:done", "flush-log", "flush-log:done", "close-db", "close-db:done"]
    );
}

#[tokio::test]
async fn defer_reports_cleanup_failure_when_work_succeeds() {
    let log = CallLog::new();
    let chain = use_middleware(
        Probe::new("work", &log).shared(),
        [
            defer(Probe::new("a", &log).fail("a-failed").shared()),
            defer(Probe::new("b", &log).shared()),
        ],
    );

    let err = chain.execute(Context::new()).await.unwrap_err();

    assert_eq!(failure_label(&err), Some("a-failed"));
    assert!(log.position("a") < log.position("b"));
}
