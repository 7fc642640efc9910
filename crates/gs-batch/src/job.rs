// job.rs - ScoreJob: everything needed for one full run, wired together.
//
// Each call to `run` builds a fresh cursor (and, when enabled, a fresh worker
// pool), so no iteration state leaks from one run into the next. The writer
// and its counters are shared across runs on purpose.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{BatchSettings, PoolConfig};
use crate::cursor::MemberCursor;
use crate::error::Result;
use crate::member::{active_since, MemberSource};
use crate::pipeline::{Pipeline, RunSummary};
use crate::pool::WorkerPool;
use crate::processor::{GoalEngine, ScoreProcessor};
use crate::writer::GoalScoreWriter;

pub struct ScoreJob {
    source: Arc<dyn MemberSource>,
    processor: ScoreProcessor,
    writer: Arc<GoalScoreWriter>,
    settings: BatchSettings,
    pool: PoolConfig,
}

impl ScoreJob {
    pub fn new(
        source: Arc<dyn MemberSource>,
        engine: Arc<dyn GoalEngine>,
        writer: Arc<GoalScoreWriter>,
        settings: BatchSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            source,
            processor: ScoreProcessor::new(engine),
            writer,
            settings,
            pool: PoolConfig::default(),
        })
    }

    /// Use this pool configuration. Only takes effect when `pool.enabled`.
    pub fn with_pool(mut self, pool: PoolConfig) -> Result<Self> {
        if pool.enabled {
            pool.validate()?;
        }
        self.pool = pool;
        Ok(self)
    }

    pub fn writer(&self) -> &Arc<GoalScoreWriter> {
        &self.writer
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Score every member active within the window ending at `now`.
    pub fn run(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        if self.settings.reset_counters_per_run {
            self.writer.reset();
        }

        let since = active_since(now, self.settings.active_window_months);
        let mut cursor = MemberCursor::new(Arc::clone(&self.source), since);
        let pipeline = Pipeline::new(&self.processor, self.writer.as_ref(), self.settings.chunk_size);

        if !self.pool.enabled {
            return pipeline.run(&mut cursor);
        }

        let pool = WorkerPool::start(&self.pool)?;
        let result = pipeline.with_pool(&pool).run(&mut cursor);
        pool.shutdown();
        result
    }
}
