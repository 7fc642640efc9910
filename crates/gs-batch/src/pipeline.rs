// pipeline.rs - The pipeline driver: pull, score, chunk, commit.
//
// One loop per run:
//   1. pull up to `chunk_size` members from the cursor
//   2. score each into an Outcome (inline, or fanned out to the worker pool)
//   3. hand the finished chunk to the ChunkSink as one commit unit
// until the cursor reports end of stream. The last chunk may be short; an
// empty source produces no chunks at all.
//
// Cursor pulls and chunk commits always happen on the calling thread, in
// order. Only the per-member scoring step is ever parallel.

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cursor::MemberCursor;
use crate::error::{BatchError, Result};
use crate::member::Member;
use crate::outcome::{Chunk, ChunkTally, Outcome};
use crate::pool::WorkerPool;
use crate::processor::ScoreProcessor;
use crate::writer::ChunkSink;

/// What one completed run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Chunks committed.
    pub chunks: usize,
    /// Members pulled from the cursor (and therefore scored).
    pub members: u64,
    /// Per-status counts for this run only.
    pub tally: ChunkTally,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Drives one run from a cursor to completion.
pub struct Pipeline<'a> {
    processor: &'a ScoreProcessor,
    sink: &'a dyn ChunkSink,
    chunk_size: usize,
    pool: Option<&'a WorkerPool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(processor: &'a ScoreProcessor, sink: &'a dyn ChunkSink, chunk_size: usize) -> Self {
        Self {
            processor,
            sink,
            chunk_size,
            pool: None,
        }
    }

    /// Score members on `pool` instead of the calling thread.
    pub fn with_pool(mut self, pool: &'a WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn run(&self, cursor: &mut MemberCursor) -> Result<RunSummary> {
        if self.chunk_size == 0 {
            return Err(BatchError::InvalidConfig(
                "chunk size must be at least 1".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut chunks = 0usize;
        let mut tally = ChunkTally::default();

        tracing::info!(%run_id, chunk_size = self.chunk_size, pooled = self.pool.is_some(), "goal score run started");

        loop {
            let members = cursor.next_batch(self.chunk_size)?;
            if members.is_empty() {
                break;
            }

            let outcomes = match self.pool {
                Some(pool) => self.score_pooled(pool, members)?,
                None => members
                    .into_iter()
                    .map(|member| self.processor.process(member))
                    .collect(),
            };

            let chunk = Chunk::new(chunks, outcomes);
            self.sink.write(&chunk)?;
            tally.merge(&chunk.tally());
            chunks += 1;

            if chunk.len() < self.chunk_size {
                break;
            }
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            chunks,
            members: tally.total(),
            tally,
        };
        tracing::info!(
            %run_id,
            chunks = summary.chunks,
            members = summary.members,
            success = tally.success,
            skipped = tally.skipped,
            failed = tally.failed,
            "goal score run finished"
        );
        Ok(summary)
    }

    // Fan the chunk's members out to the pool and collect outcomes back into
    // pull order.
    fn score_pooled(&self, pool: &WorkerPool, members: Vec<Member>) -> Result<Vec<Outcome>> {
        let ids: Vec<String> = members.iter().map(|m| m.id.to_string()).collect();
        let (tx, rx) = mpsc::channel::<(usize, Outcome)>();

        for (index, member) in members.into_iter().enumerate() {
            let processor = self.processor.clone();
            let tx = tx.clone();
            pool.submit(move || {
                let outcome = processor.process(member);
                // The receiver only goes away if the run already failed.
                let _ = tx.send((index, outcome));
            })?;
        }
        drop(tx);

        let mut slots: Vec<Option<Outcome>> = vec![None; ids.len()];
        for (index, outcome) in rx {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, member_id)| slot.ok_or(BatchError::WorkerLost { member_id }))
            .collect()
    }
}
