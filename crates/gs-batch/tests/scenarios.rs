// scenarios.rs - End-to-end runs through cursor, processor, writer and pool.
//
// Scripted collaborators stand in for the member store and Goal Engine so
// each scenario can state exactly which members score, skip, or fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use chrono::{DateTime, Utc};

use gs_batch::{
    BatchError, BatchSettings, Chunk, ChunkSink, GoalAssessment, GoalEngine, GoalEngineError,
    GoalScore, GoalScoreWriter, InMemoryMetrics, Member, MemberCursor, MemberId, MemberSource,
    Outcome, OutcomeStatus, Pipeline, PoolConfig, RunCounters, ScoreJob, ScoreProcessor,
    SourceError, WorkerPool,
};

#[derive(Clone, Copy)]
enum Script {
    Score,
    NoGoal,
    Fail,
    Panic,
}

struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    fn new(scripts: &[(&str, Script)]) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .iter()
                .map(|(id, s)| (id.to_string(), *s))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GoalEngine for ScriptedEngine {
    fn score_member(&self, member_id: &MemberId) -> Result<GoalAssessment, GoalEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(member_id.as_str()).copied().unwrap_or(Script::Score) {
            Script::Score => Ok(GoalAssessment::Scored(GoalScore { value: 75.0 })),
            Script::NoGoal => Ok(GoalAssessment::NoApplicableGoal),
            Script::Fail => Err(GoalEngineError::new(format!(
                "spending history unavailable for {member_id}"
            ))),
            Script::Panic => panic!("engine crashed on {member_id}"),
        }
    }
}

struct StaticSource(Vec<Member>);

impl StaticSource {
    fn ids(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self(ids.iter().map(|id| Member::new(*id, Utc::now())).collect()))
    }

    fn numbered(n: usize) -> Arc<Self> {
        Arc::new(Self(
            (0..n).map(|i| Member::new(format!("m{i}"), Utc::now())).collect(),
        ))
    }
}

impl MemberSource for StaticSource {
    fn find_active_members(&self, _since: DateTime<Utc>) -> Result<Vec<Member>, SourceError> {
        Ok(self.0.clone())
    }
}

struct DownSource;

impl MemberSource for DownSource {
    fn find_active_members(&self, _since: DateTime<Utc>) -> Result<Vec<Member>, SourceError> {
        Err(SourceError::new("member store unreachable"))
    }
}

/// Wraps the real writer and remembers every committed chunk.
struct Recorder {
    inner: GoalScoreWriter,
    chunks: Mutex<Vec<(Chunk, ThreadId)>>,
}

impl Recorder {
    fn new(counters: Arc<RunCounters>) -> Self {
        Self {
            inner: GoalScoreWriter::new(counters),
            chunks: Mutex::new(Vec::new()),
        }
    }

    fn sizes(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().iter().map(|(c, _)| c.len()).collect()
    }

    fn outcomes(&self) -> Vec<Outcome> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(c, _)| c.outcomes.clone())
            .collect()
    }
}

impl ChunkSink for Recorder {
    fn write(&self, chunk: &Chunk) -> gs_batch::error::Result<()> {
        self.inner.write(chunk)?;
        self.chunks
            .lock()
            .unwrap()
            .push((chunk.clone(), thread::current().id()));
        Ok(())
    }
}

#[test]
fn scenario_a_score_skip_and_fail_in_one_chunk() {
    let engine = ScriptedEngine::new(&[
        ("m1", Script::Score),
        ("m2", Script::NoGoal),
        ("m3", Script::Fail),
    ]);
    let counters = Arc::new(RunCounters::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let writer = Arc::new(GoalScoreWriter::new(counters.clone()).with_metrics(metrics.clone()));
    let job = ScoreJob::new(
        StaticSource::ids(&["m1", "m2", "m3"]),
        engine.clone(),
        writer,
        BatchSettings::default(),
    )
    .unwrap();

    let summary = job.run(Utc::now()).unwrap();

    assert_eq!(summary.chunks, 1);
    assert_eq!(counters.success(), 1);
    assert_eq!(counters.skipped(), 1);
    assert_eq!(counters.failed(), 1);
    assert_eq!(metrics.counter("batch.goal_score.success", &[]), 1);
    assert_eq!(metrics.counter("batch.goal_score.skipped", &[]), 1);
    assert_eq!(metrics.counter("batch.goal_score.failed", &[]), 1);
    assert_eq!(engine.calls(), 3);
}

#[test]
fn scenario_b_twenty_five_members_in_three_chunks() {
    let engine = ScriptedEngine::new(&[]);
    let counters = Arc::new(RunCounters::new());
    let recorder = Recorder::new(counters.clone());
    let processor = ScoreProcessor::new(engine);
    let mut cursor = MemberCursor::new(StaticSource::numbered(25), Utc::now());

    let summary = Pipeline::new(&processor, &recorder, 10)
        .run(&mut cursor)
        .unwrap();

    assert_eq!(recorder.sizes(), vec![10, 10, 5]);
    assert_eq!(summary.chunks, 3);
    assert_eq!(counters.success(), 25);
    assert_eq!(counters.skipped(), 0);
    assert_eq!(counters.failed(), 0);
}

#[test]
fn counts_add_up_to_members_returned_by_source() {
    let scripts: Vec<(String, Script)> = (0..23)
        .map(|i| {
            let script = match i % 4 {
                0 => Script::Score,
                1 => Script::NoGoal,
                2 => Script::Fail,
                _ => Script::Panic,
            };
            (format!("m{i}"), script)
        })
        .collect();
    let script_refs: Vec<(&str, Script)> =
        scripts.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    let engine = ScriptedEngine::new(&script_refs);

    let counters = Arc::new(RunCounters::new());
    counters.increment(OutcomeStatus::Success);
    let before = counters.snapshot();

    let writer = GoalScoreWriter::new(counters.clone());
    let processor = ScoreProcessor::new(engine);
    let mut cursor = MemberCursor::new(StaticSource::numbered(23), Utc::now());
    Pipeline::new(&processor, &writer, 5).run(&mut cursor).unwrap();

    let delta = counters.snapshot().since(&before);
    assert_eq!(delta.total(), 23);
}

#[test]
fn one_failure_does_not_change_other_outcomes() {
    let baseline_engine = ScriptedEngine::new(&[]);
    let failing_engine = ScriptedEngine::new(&[("m4", Script::Fail), ("m12", Script::Panic)]);

    let run = |engine: Arc<ScriptedEngine>| {
        let recorder = Recorder::new(Arc::new(RunCounters::new()));
        let processor = ScoreProcessor::new(engine);
        let mut cursor = MemberCursor::new(StaticSource::numbered(15), Utc::now());
        Pipeline::new(&processor, &recorder, 10)
            .run(&mut cursor)
            .unwrap();
        recorder.outcomes()
    };

    let baseline = run(baseline_engine);
    let with_failures = run(failing_engine);

    assert_eq!(baseline.len(), with_failures.len());
    for (a, b) in baseline.iter().zip(&with_failures) {
        assert_eq!(a.member().id, b.member().id);
        let id = a.member().id.as_str();
        if id == "m4" || id == "m12" {
            assert_eq!(b.status(), OutcomeStatus::Failed);
        } else {
            assert_eq!(a.status(), b.status());
            assert_eq!(a.reason(), b.reason());
        }
    }
}

#[test]
fn source_failure_aborts_run_without_scoring() {
    let engine = ScriptedEngine::new(&[]);
    let counters = Arc::new(RunCounters::new());
    let writer = Arc::new(GoalScoreWriter::new(counters.clone()));
    let job = ScoreJob::new(
        Arc::new(DownSource),
        engine.clone(),
        writer,
        BatchSettings::default(),
    )
    .unwrap();

    let result = job.run(Utc::now());
    assert!(matches!(result, Err(BatchError::SourceUnavailable(_))));
    assert_eq!(engine.calls(), 0);
    assert_eq!(counters.snapshot().total(), 0);
}

#[test]
fn pooled_scoring_keeps_pull_order_and_commits_on_caller_thread() {
    let engine = ScriptedEngine::new(&[("m3", Script::Fail), ("m17", Script::NoGoal)]);
    let counters = Arc::new(RunCounters::new());
    let recorder = Recorder::new(counters.clone());
    let processor = ScoreProcessor::new(engine);
    let pool = WorkerPool::start(&PoolConfig {
        enabled: true,
        core_workers: 3,
        max_workers: 6,
        queue_capacity: 4,
        ..PoolConfig::default()
    })
    .unwrap();

    let mut cursor = MemberCursor::new(StaticSource::numbered(42), Utc::now());
    let summary = Pipeline::new(&processor, &recorder, 10)
        .with_pool(&pool)
        .run(&mut cursor)
        .unwrap();
    pool.shutdown();

    assert_eq!(summary.chunks, 5);
    assert_eq!(recorder.sizes(), vec![10, 10, 10, 10, 2]);

    let ids: Vec<String> = recorder
        .outcomes()
        .iter()
        .map(|o| o.member().id.to_string())
        .collect();
    let expected: Vec<String> = (0..42).map(|i| format!("m{i}")).collect();
    assert_eq!(ids, expected);

    let caller = thread::current().id();
    let chunks = recorder.chunks.lock().unwrap();
    assert!(chunks.iter().all(|(_, tid)| *tid == caller));
    let indexes: Vec<usize> = chunks.iter().map(|(c, _)| c.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);

    assert_eq!(counters.success(), 40);
    assert_eq!(counters.skipped(), 1);
    assert_eq!(counters.failed(), 1);
}
