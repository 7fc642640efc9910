//! # gs-batch
//!
//! Chunked batch engine that recomputes every active member's goal score.
//!
//! A run pulls members lazily from a [`MemberCursor`], turns each one into an
//! [`Outcome`] with the [`ScoreProcessor`] (a Goal Engine failure for one
//! member never stops the run), groups outcomes into fixed-size [`Chunk`]s,
//! and commits each chunk through a [`ChunkSink`] that keeps the cumulative
//! [`RunCounters`] and publishes metrics.
//!
//! ## Key components
//!
//! - [`MemberCursor`]: lazy state machine (Uninitialized → Loaded → Exhausted)
//!   over one run's member snapshot
//! - [`ScoreProcessor`]: maps Goal Engine results to Success / Skipped / Failed
//! - [`GoalScoreWriter`]: chunk commit: counters plus per-status metric deltas
//! - [`Pipeline`]: the driver loop, optionally fanning scoring out to a
//!   [`WorkerPool`]
//! - [`ScoreJob`]: one full run wired from config
//! - [`MetricsSink`]: where counters and gauges go

pub mod config;
pub mod counters;
pub mod cursor;
pub mod error;
pub mod job;
pub mod member;
pub mod metrics;
pub mod outcome;
pub mod pipeline;
pub mod pool;
pub mod processor;
pub mod writer;

pub use config::{BatchSettings, PoolConfig, RejectionPolicy};
pub use counters::{CounterSnapshot, RunCounters};
pub use cursor::{CursorState, MemberCursor};
pub use error::{BatchError, GoalEngineError, PoolError, SinkError, SourceError};
pub use job::ScoreJob;
pub use member::{active_since, Member, MemberId, MemberSource};
pub use metrics::{FanoutMetrics, InMemoryMetrics, JsonlMetricsSink, MetricEvent, MetricsSink};
pub use outcome::{Chunk, ChunkTally, Outcome, OutcomeStatus};
pub use pipeline::{Pipeline, RunSummary};
pub use pool::WorkerPool;
pub use processor::{GoalAssessment, GoalEngine, GoalScore, ScoreProcessor, NO_GOAL_REASON};
pub use writer::{ChunkSink, GoalScoreWriter};
