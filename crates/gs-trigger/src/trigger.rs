// trigger.rs - Scheduled and manual entry points into a goal score run.
//
// Both paths end in `TriggeredRun::execute`, which runs the job on the
// current thread, records run-level metrics, and never lets a failure or a
// panic escape. The scheduled path runs synchronously after the last-day
// gate; the manual path records "started" on the caller's thread, hands the
// run to the blocking pool, and returns an acknowledgement right away.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use gs_batch::metrics::{names, Tag};
use gs_batch::{MetricsSink, RunSummary, ScoreJob};

use crate::gate::{last_day_of_month, should_run_today};

/// Which entry point started a run. Tagged onto run-level metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Scheduled,
    Manual,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Scheduled => "scheduled",
            TriggerKind::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one trigger invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// Not the last day of the month; nothing ran.
    Skipped {
        today: NaiveDate,
        last_day: NaiveDate,
    },
    Completed(RunSummary),
    /// The run started but ended in an error or a panic.
    Failed { reason: String },
}

impl TriggerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TriggerOutcome::Completed(_))
    }
}

/// Returned by [`ScoreTrigger::run_now`] before the run has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
    pub requested_at: DateTime<Utc>,
}

impl fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The job plus the optional sink for run-level metrics. Shared with the
/// blocking task on the manual path.
struct TriggeredRun {
    job: Arc<ScoreJob>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl TriggeredRun {
    /// Record that a run is starting. Returns the start instant.
    fn begin(&self, kind: TriggerKind) -> DateTime<Utc> {
        let started_at = Utc::now();
        let tags = [("job", names::JOB_TAG), ("trigger", kind.as_str())];
        self.counter(names::JOB_STARTED, &tags);
        self.gauge(names::JOB_START_TIME, started_at.timestamp_millis(), &tags);
        started_at
    }

    fn execute(&self, kind: TriggerKind, started_at: DateTime<Utc>) -> TriggerOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.job.run(Utc::now())));

        let finished_at = Utc::now();
        let base = [("job", names::JOB_TAG), ("trigger", kind.as_str())];
        self.gauge(names::JOB_END_TIME, finished_at.timestamp_millis(), &base);
        self.gauge(
            names::JOB_DURATION,
            (finished_at - started_at).num_milliseconds(),
            &base,
        );

        let outcome = match result {
            Ok(Ok(summary)) => TriggerOutcome::Completed(summary),
            Ok(Err(e)) => TriggerOutcome::Failed {
                reason: e.to_string(),
            },
            Err(payload) => TriggerOutcome::Failed {
                reason: format!("run panicked: {}", panic_message(payload.as_ref())),
            },
        };

        match &outcome {
            TriggerOutcome::Completed(summary) => {
                self.counter(
                    names::JOB_COMPLETED,
                    &[base[0], base[1], ("status", "success")],
                );
                tracing::info!(
                    trigger = %kind,
                    run_id = %summary.run_id,
                    members = summary.members,
                    duration_ms = summary.duration_ms(),
                    "goal score job completed"
                );
            }
            TriggerOutcome::Failed { reason } => {
                self.counter(
                    names::JOB_FAILED,
                    &[base[0], base[1], ("status", "failure")],
                );
                tracing::error!(trigger = %kind, error = %reason, "goal score job failed");
            }
            TriggerOutcome::Skipped { .. } => {}
        }
        outcome
    }

    // Metric failures are logged and otherwise ignored here: a run that
    // already happened is not undone by a broken metrics file.
    fn counter(&self, name: &str, tags: &[Tag<'_>]) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        if let Err(e) = metrics.increment_counter(name, 1, tags) {
            tracing::warn!(metric = name, error = %e, "failed to record run counter");
        }
    }

    fn gauge(&self, name: &str, value: i64, tags: &[Tag<'_>]) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        if let Err(e) = metrics.set_gauge(name, value, tags) {
            tracing::warn!(metric = name, error = %e, "failed to record run gauge");
        }
    }
}

/// Entry points for goal score runs.
pub struct ScoreTrigger {
    run: Arc<TriggeredRun>,
    runtime: Handle,
}

impl ScoreTrigger {
    /// `runtime` hosts the manual path's background runs.
    pub fn new(job: Arc<ScoreJob>, metrics: Arc<dyn MetricsSink>, runtime: Handle) -> Self {
        Self {
            run: Arc::new(TriggeredRun {
                job,
                metrics: Some(metrics),
            }),
            runtime,
        }
    }

    /// A trigger that records no run-level metrics. Outcomes and logging
    /// are unchanged.
    pub fn without_metrics(job: Arc<ScoreJob>, runtime: Handle) -> Self {
        Self {
            run: Arc::new(TriggeredRun { job, metrics: None }),
            runtime,
        }
    }

    pub fn job(&self) -> &Arc<ScoreJob> {
        &self.run.job
    }

    /// Daily tick. Runs the job to completion only on the last day of
    /// `today`'s month. Blocks the calling thread for the whole run.
    pub fn on_schedule(&self, today: NaiveDate) -> TriggerOutcome {
        if !should_run_today(today) {
            let last_day = last_day_of_month(today);
            tracing::debug!(%today, %last_day, "not the last day of the month, skipping goal score run");
            return TriggerOutcome::Skipped { today, last_day };
        }

        tracing::info!(%today, "last day of the month, starting goal score run");
        let started_at = self.run.begin(TriggerKind::Scheduled);
        self.run.execute(TriggerKind::Scheduled, started_at)
    }

    /// Manual trigger. Records the start, dispatches the run to the blocking
    /// pool, and returns without waiting for it.
    pub fn run_now(&self) -> Acknowledgement {
        self.dispatch().0
    }

    /// Like [`run_now`](Self::run_now), but also hands back the task so the
    /// caller can wait for the outcome if it wants to.
    pub fn dispatch(&self) -> (Acknowledgement, JoinHandle<TriggerOutcome>) {
        let started_at = self.run.begin(TriggerKind::Manual);
        let run = Arc::clone(&self.run);
        let handle = self
            .runtime
            .spawn_blocking(move || run.execute(TriggerKind::Manual, started_at));

        tracing::info!("goal score job dispatched in the background");
        let ack = Acknowledgement {
            message: format!(
                "Goal score calculation started asynchronously at {}",
                started_at.to_rfc3339()
            ),
            requested_at: started_at,
        };
        (ack, handle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
