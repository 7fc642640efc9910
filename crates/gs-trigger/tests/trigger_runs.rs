// trigger_runs.rs - Scheduled and manual trigger behaviour against a real
// ScoreJob with scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::runtime::Runtime;

use gs_batch::metrics::names;
use gs_batch::{
    BatchSettings, GoalAssessment, GoalEngine, GoalEngineError, GoalScore, GoalScoreWriter,
    InMemoryMetrics, Member, MemberId, MemberSource, RunCounters, ScoreJob, SourceError,
};
use gs_trigger::{ScoreTrigger, TriggerOutcome};

struct Members(usize);

impl MemberSource for Members {
    fn find_active_members(&self, _since: DateTime<Utc>) -> Result<Vec<Member>, SourceError> {
        Ok((0..self.0)
            .map(|i| Member::new(format!("m{i}"), Utc::now()))
            .collect())
    }
}

struct Unreachable;

impl MemberSource for Unreachable {
    fn find_active_members(&self, _since: DateTime<Utc>) -> Result<Vec<Member>, SourceError> {
        Err(SourceError::new("connection refused"))
    }
}

struct Exploding;

impl MemberSource for Exploding {
    fn find_active_members(&self, _since: DateTime<Utc>) -> Result<Vec<Member>, SourceError> {
        panic!("member query blew up")
    }
}

#[derive(Default)]
struct CountingEngine {
    calls: AtomicUsize,
}

impl GoalEngine for CountingEngine {
    fn score_member(&self, _: &MemberId) -> Result<GoalAssessment, GoalEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GoalAssessment::Scored(GoalScore { value: 88.0 }))
    }
}

/// Scores only once released, one member per message.
struct HeldEngine {
    release: Mutex<Receiver<()>>,
}

impl HeldEngine {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                release: Mutex::new(rx),
            }),
            tx,
        )
    }
}

impl GoalEngine for HeldEngine {
    fn score_member(&self, _: &MemberId) -> Result<GoalAssessment, GoalEngineError> {
        self.release
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| GoalEngineError::new("released without a signal"))?;
        Ok(GoalAssessment::Scored(GoalScore { value: 1.0 }))
    }
}

struct Fixture {
    trigger: ScoreTrigger,
    metrics: Arc<InMemoryMetrics>,
    counters: Arc<RunCounters>,
}

fn fixture(
    source: Arc<dyn MemberSource>,
    engine: Arc<dyn GoalEngine>,
    runtime: tokio::runtime::Handle,
) -> Fixture {
    let metrics = Arc::new(InMemoryMetrics::new());
    let counters = Arc::new(RunCounters::new());
    let writer = Arc::new(GoalScoreWriter::new(counters.clone()).with_metrics(metrics.clone()));
    let job = ScoreJob::new(source, engine, writer, BatchSettings::default()).unwrap();
    Fixture {
        trigger: ScoreTrigger::new(Arc::new(job), metrics.clone(), runtime),
        metrics,
        counters,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn wait_for_counter(metrics: &InMemoryMetrics, name: &str, expected: u64) {
    for _ in 0..200 {
        if metrics.counter_total(name) >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{name} never reached {expected}");
}

#[test]
fn scenario_c_mid_month_tick_is_a_no_op() {
    let rt = Runtime::new().unwrap();
    let engine = Arc::new(CountingEngine::default());
    let f = fixture(Arc::new(Members(5)), engine.clone(), rt.handle().clone());

    let outcome = f.trigger.on_schedule(date(2024, 6, 14));

    assert_eq!(
        outcome,
        TriggerOutcome::Skipped {
            today: date(2024, 6, 14),
            last_day: date(2024, 6, 30),
        }
    );
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.counters.snapshot().total(), 0);
    assert_eq!(f.metrics.counter_total(names::JOB_STARTED), 0);
}

#[test]
fn scenario_d_last_day_runs_every_time_it_fires() {
    let rt = Runtime::new().unwrap();
    let engine = Arc::new(CountingEngine::default());
    let f = fixture(Arc::new(Members(4)), engine.clone(), rt.handle().clone());

    let first = f.trigger.on_schedule(date(2024, 6, 30));
    let second = f.trigger.on_schedule(date(2024, 6, 30));

    assert!(first.is_completed());
    assert!(second.is_completed());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 8);
    assert_eq!(f.counters.success(), 8);

    let tags = [
        ("job", names::JOB_TAG),
        ("trigger", "scheduled"),
        ("status", "success"),
    ];
    assert_eq!(f.metrics.counter(names::JOB_COMPLETED, &tags), 2);
    assert_eq!(f.metrics.counter_total(names::JOB_STARTED), 2);
}

#[test]
fn leap_day_opens_the_gate() {
    let rt = Runtime::new().unwrap();
    let engine = Arc::new(CountingEngine::default());
    let f = fixture(Arc::new(Members(1)), engine.clone(), rt.handle().clone());

    assert!(!f.trigger.on_schedule(date(2024, 2, 28)).is_completed());
    assert!(f.trigger.on_schedule(date(2024, 2, 29)).is_completed());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn scheduled_source_failure_is_absorbed_and_counted() {
    let rt = Runtime::new().unwrap();
    let f = fixture(
        Arc::new(Unreachable),
        Arc::new(CountingEngine::default()),
        rt.handle().clone(),
    );

    let outcome = f.trigger.on_schedule(date(2024, 1, 31));

    match outcome {
        TriggerOutcome::Failed { reason } => assert!(reason.contains("connection refused")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(f.metrics.counter_total(names::JOB_FAILED), 1);
    assert_eq!(f.metrics.counter_total(names::JOB_COMPLETED), 0);
    let tags = [("job", names::JOB_TAG), ("trigger", "scheduled")];
    assert!(f.metrics.gauge(names::JOB_END_TIME, &tags).is_some());
}

#[test]
fn panicking_run_never_escapes_the_trigger() {
    let rt = Runtime::new().unwrap();
    let f = fixture(
        Arc::new(Exploding),
        Arc::new(CountingEngine::default()),
        rt.handle().clone(),
    );

    match f.trigger.on_schedule(date(2024, 3, 31)) {
        TriggerOutcome::Failed { reason } => assert!(reason.contains("member query blew up")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(f.metrics.counter_total(names::JOB_FAILED), 1);
}

#[test]
fn trigger_without_metrics_still_reports_outcomes() {
    let rt = Runtime::new().unwrap();
    let writer = Arc::new(GoalScoreWriter::new(Arc::new(RunCounters::new())));
    let job = ScoreJob::new(
        Arc::new(Members(3)),
        Arc::new(CountingEngine::default()),
        writer,
        BatchSettings::default(),
    )
    .unwrap();
    let trigger = ScoreTrigger::without_metrics(Arc::new(job), rt.handle().clone());

    match trigger.on_schedule(date(2024, 9, 30)) {
        TriggerOutcome::Completed(summary) => assert_eq!(summary.members, 3),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(trigger.job().writer().success_count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_trigger_acknowledges_before_the_run_finishes() {
    let (engine, release) = HeldEngine::new();
    let f = fixture(Arc::new(Members(3)), engine, tokio::runtime::Handle::current());

    let ack = f.trigger.run_now();

    assert!(!ack.message.is_empty());
    let tags = [("job", names::JOB_TAG), ("trigger", "manual")];
    assert_eq!(f.metrics.counter(names::JOB_STARTED, &tags), 1);
    assert_eq!(
        f.metrics.gauge(names::JOB_START_TIME, &tags),
        Some(ack.requested_at.timestamp_millis())
    );
    assert_eq!(f.metrics.counter_total(names::JOB_COMPLETED), 0);

    for _ in 0..3 {
        release.send(()).unwrap();
    }
    wait_for_counter(&f.metrics, names::JOB_COMPLETED, 1).await;

    assert_eq!(f.counters.success(), 3);
    assert!(f.metrics.gauge(names::JOB_END_TIME, &tags).is_some());
    assert!(f.metrics.gauge(names::JOB_DURATION, &tags).unwrap() >= 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_trigger_ignores_the_gate_and_reports_failure_through_metrics() {
    let f = fixture(
        Arc::new(Unreachable),
        Arc::new(CountingEngine::default()),
        tokio::runtime::Handle::current(),
    );

    let (_ack, handle) = f.trigger.dispatch();
    let outcome = handle.await.unwrap();

    assert!(matches!(outcome, TriggerOutcome::Failed { .. }));
    let tags = [
        ("job", names::JOB_TAG),
        ("trigger", "manual"),
        ("status", "failure"),
    ];
    assert_eq!(f.metrics.counter(names::JOB_FAILED, &tags), 1);
}
