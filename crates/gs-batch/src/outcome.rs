// outcome.rs - Per-member outcomes and the chunks that carry them.
//
// Every member visited in a run yields exactly one Outcome. The variants
// keep "no applicable goal" (Skipped) strictly apart from "the engine
// failed" (Failed); callers pattern-match instead of catching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::member::Member;

/// Result of scoring one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The Goal Engine computed and persisted a score.
    Success { member: Member },

    /// No goal applied to the member this period. Not an error.
    Skipped { member: Member, reason: String },

    /// The Goal Engine raised an error; `reason` is its message.
    Failed { member: Member, reason: String },
}

impl Outcome {
    pub fn success(member: Member) -> Self {
        Outcome::Success { member }
    }

    pub fn skipped(member: Member, reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            member,
            reason: reason.into(),
        }
    }

    pub fn failed(member: Member, reason: impl Into<String>) -> Self {
        Outcome::Failed {
            member,
            reason: reason.into(),
        }
    }

    pub fn member(&self) -> &Member {
        match self {
            Outcome::Success { member }
            | Outcome::Skipped { member, .. }
            | Outcome::Failed { member, .. } => member,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Success { .. } => OutcomeStatus::Success,
            Outcome::Skipped { .. } => OutcomeStatus::Skipped,
            Outcome::Failed { .. } => OutcomeStatus::Failed,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Skipped { reason, .. } | Outcome::Failed { reason, .. } => Some(reason),
        }
    }
}

/// The status tag of an [`Outcome`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Failed,
}

impl OutcomeStatus {
    pub const ALL: [OutcomeStatus; 3] = [
        OutcomeStatus::Success,
        OutcomeStatus::Skipped,
        OutcomeStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, bounded group of outcomes committed as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Zero-based position of this chunk within its run.
    pub index: usize,
    pub outcomes: Vec<Outcome>,
}

impl Chunk {
    pub fn new(index: usize, outcomes: Vec<Outcome>) -> Self {
        Self { index, outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Per-status counts for this chunk.
    pub fn tally(&self) -> ChunkTally {
        let mut tally = ChunkTally::default();
        for outcome in &self.outcomes {
            tally.add(outcome.status());
        }
        tally
    }
}

/// Success/skipped/failed counts for one chunk or one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTally {
    pub success: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl ChunkTally {
    pub fn add(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn get(&self, status: OutcomeStatus) -> u64 {
        match status {
            OutcomeStatus::Success => self.success,
            OutcomeStatus::Skipped => self.skipped,
            OutcomeStatus::Failed => self.failed,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.skipped + self.failed
    }

    pub fn merge(&mut self, other: &ChunkTally) {
        self.success += other.success;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}
