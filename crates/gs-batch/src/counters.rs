// counters.rs - Cumulative run counters.
//
// One RunCounters value lives for as long as the process wants it to, shared
// through an Arc. Counts only ever go up until someone calls `reset()`;
// nothing resets them implicitly between runs.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::outcome::{ChunkTally, OutcomeStatus};

/// Success/skipped/failed totals across every chunk written since the last reset.
#[derive(Debug, Default)]
pub struct RunCounters {
    success: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, status: OutcomeStatus) {
        self.cell(status).fetch_add(1, Ordering::Relaxed);
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn get(&self, status: OutcomeStatus) -> u64 {
        self.cell(status).load(Ordering::Relaxed)
    }

    /// Zero all three counters.
    pub fn reset(&self) {
        self.success.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            success: self.success(),
            skipped: self.skipped(),
            failed: self.failed(),
        }
    }

    fn cell(&self, status: OutcomeStatus) -> &AtomicU64 {
        match status {
            OutcomeStatus::Success => &self.success,
            OutcomeStatus::Skipped => &self.skipped,
            OutcomeStatus::Failed => &self.failed,
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub success: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl CounterSnapshot {
    pub fn total(&self) -> u64 {
        self.success + self.skipped + self.failed
    }

    /// Counts accumulated between `earlier` and `self`.
    pub fn since(&self, earlier: &CounterSnapshot) -> ChunkTally {
        ChunkTally {
            success: self.success.saturating_sub(earlier.success),
            skipped: self.skipped.saturating_sub(earlier.skipped),
            failed: self.failed.saturating_sub(earlier.failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_counters_start_at_zero() {
        let counters = RunCounters::new();
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn increment_touches_only_its_status() {
        let counters = RunCounters::new();
        counters.increment(OutcomeStatus::Skipped);
        counters.increment(OutcomeStatus::Skipped);
        assert_eq!(counters.success(), 0);
        assert_eq!(counters.skipped(), 2);
        assert_eq!(counters.failed(), 0);
    }

    #[test]
    fn reset_zeroes_everything_regardless_of_history() {
        let counters = RunCounters::new();
        for status in OutcomeStatus::ALL {
            for _ in 0..7 {
                counters.increment(status);
            }
        }
        counters.reset();
        assert_eq!(counters.success(), 0);
        assert_eq!(counters.skipped(), 0);
        assert_eq!(counters.failed(), 0);
        counters.reset();
        assert_eq!(counters.snapshot().total(), 0);
    }

    #[test]
    fn snapshot_delta_reports_new_counts_only() {
        let counters = RunCounters::new();
        counters.increment(OutcomeStatus::Success);
        let before = counters.snapshot();
        counters.increment(OutcomeStatus::Success);
        counters.increment(OutcomeStatus::Failed);
        let delta = counters.snapshot().since(&before);
        assert_eq!(delta.success, 1);
        assert_eq!(delta.failed, 1);
        assert_eq!(delta.total(), 2);
    }
}
