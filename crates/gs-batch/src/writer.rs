// writer.rs - Chunk commit: counting outcomes and publishing per-status deltas.
//
// Scores were already persisted by the Goal Engine inside the processor, so
// committing a chunk here means bookkeeping only: bump the run counters and
// tell the metrics sink how many of each status the chunk held.

use std::sync::Arc;

use crate::counters::{CounterSnapshot, RunCounters};
use crate::error::{BatchError, Result};
use crate::metrics::{names, MetricsSink};
use crate::outcome::{Chunk, ChunkTally, OutcomeStatus};

/// Receives each completed chunk, in order, as one commit unit.
///
/// Implementations must not fail for data reasons; an error means the
/// backing sink is gone and the run should stop.
pub trait ChunkSink: Send + Sync {
    fn write(&self, chunk: &Chunk) -> Result<()>;
}

/// The default chunk sink: run counters plus an optional metrics sink.
pub struct GoalScoreWriter {
    counters: Arc<RunCounters>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl GoalScoreWriter {
    pub fn new(counters: Arc<RunCounters>) -> Self {
        Self {
            counters,
            metrics: None,
        }
    }

    /// Also publish per-chunk deltas to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    pub fn success_count(&self) -> u64 {
        self.counters.success()
    }

    pub fn skipped_count(&self) -> u64 {
        self.counters.skipped()
    }

    pub fn failed_count(&self) -> u64 {
        self.counters.failed()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Zero the cumulative counters. Only ever called on purpose.
    pub fn reset(&self) {
        self.counters.reset();
    }

    fn publish(&self, tally: &ChunkTally) -> Result<()> {
        let Some(metrics) = &self.metrics else {
            return Ok(());
        };
        for status in OutcomeStatus::ALL {
            let delta = tally.get(status);
            if delta == 0 {
                continue;
            }
            metrics
                .increment_counter(metric_name(status), delta, &[])
                .map_err(BatchError::SinkUnavailable)?;
        }
        Ok(())
    }
}

fn metric_name(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => names::GOAL_SCORE_SUCCESS,
        OutcomeStatus::Skipped => names::GOAL_SCORE_SKIPPED,
        OutcomeStatus::Failed => names::GOAL_SCORE_FAILED,
    }
}

impl ChunkSink for GoalScoreWriter {
    fn write(&self, chunk: &Chunk) -> Result<()> {
        let mut tally = ChunkTally::default();
        for outcome in &chunk.outcomes {
            let status = outcome.status();
            self.counters.increment(status);
            tally.add(status);
        }

        self.publish(&tally)?;

        tracing::debug!(
            chunk = chunk.index,
            success = tally.success,
            skipped = tally.skipped,
            failed = tally.failed,
            "chunk committed"
        );
        Ok(())
    }
}
