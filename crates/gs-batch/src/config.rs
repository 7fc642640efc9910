//! Batch and worker-pool configuration.
//!
//! Both structs deserialize from their own TOML table (`[batch]`, `[pool]`)
//! with every field defaulted, so an empty file yields the stock settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, Result};

/// `[batch]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Members per chunk (commit unit). Must be at least 1.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Trailing window, in calendar months, for "active" members.
    #[serde(default = "default_active_window_months")]
    pub active_window_months: u32,

    /// Reset the cumulative counters at the start of every run.
    /// Off by default: counters accumulate until reset explicitly.
    #[serde(default)]
    pub reset_counters_per_run: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            active_window_months: default_active_window_months(),
            reset_counters_per_run: false,
        }
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BatchError::InvalidConfig(
                "batch.chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What happens to a submission when the queue is full and the pool is at
/// `max_workers`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Wait for queue space.
    #[default]
    Block,
    /// Refuse the job; the run aborts with `PoolError::Saturated`.
    Abort,
    /// Run the job on the submitting thread.
    CallerRuns,
}

/// `[pool]` settings for the item-scoring worker pool.
///
/// The pool only exists when `enabled` is true; otherwise the pipeline
/// scores members on the coordinating thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_core_workers")]
    pub core_workers: usize,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Worker threads are named `<prefix><n>`.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Grace period for busy workers on shutdown.
    #[serde(default = "default_await_termination_secs")]
    pub await_termination_secs: u64,

    #[serde(default)]
    pub rejection: RejectionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            core_workers: default_core_workers(),
            max_workers: default_max_workers(),
            queue_capacity: default_queue_capacity(),
            thread_name_prefix: default_thread_name_prefix(),
            await_termination_secs: default_await_termination_secs(),
            rejection: RejectionPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn await_termination(&self) -> Duration {
        Duration::from_secs(self.await_termination_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.core_workers == 0 {
            return Err(BatchError::InvalidConfig(
                "pool.core_workers must be at least 1".to_string(),
            ));
        }
        if self.max_workers < self.core_workers {
            return Err(BatchError::InvalidConfig(format!(
                "pool.max_workers ({}) must be >= pool.core_workers ({})",
                self.max_workers, self.core_workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(BatchError::InvalidConfig(
                "pool.queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// Serde default functions
fn default_chunk_size() -> usize {
    10
}

fn default_active_window_months() -> u32 {
    3
}

fn default_core_workers() -> usize {
    5
}

fn default_max_workers() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    100
}

fn default_thread_name_prefix() -> String {
    "goal-score-batch-".to_string()
}

fn default_await_termination_secs() -> u64 {
    60
}
