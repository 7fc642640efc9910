// processor.rs - ScoreProcessor: one member in, one Outcome out.
//
// The processor is the failure-isolation boundary. Whatever the Goal Engine
// does (returns a score, says no goal applies, errors, or panics) is turned
// into an Outcome value. Nothing propagates past `process`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GoalEngineError;
use crate::member::{Member, MemberId};
use crate::outcome::Outcome;

/// Reason recorded on `Skipped` outcomes.
pub const NO_GOAL_REASON: &str = "no applicable goal";

/// A computed goal score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalScore {
    pub value: f64,
}

/// What the Goal Engine reports for a member, when it doesn't fail.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalAssessment {
    /// A score was computed and persisted.
    Scored(GoalScore),

    /// The member has no goal for this period. A normal answer, not an error.
    NoApplicableGoal,
}

/// The external scoring service, invoked once per member.
///
/// Implementations must tolerate concurrent calls for distinct members when
/// the worker pool is enabled.
pub trait GoalEngine: Send + Sync {
    fn score_member(&self, member_id: &MemberId) -> Result<GoalAssessment, GoalEngineError>;
}

/// Maps Goal Engine results onto outcomes.
#[derive(Clone)]
pub struct ScoreProcessor {
    engine: Arc<dyn GoalEngine>,
}

impl ScoreProcessor {
    pub fn new(engine: Arc<dyn GoalEngine>) -> Self {
        Self { engine }
    }

    /// Score one member. Never fails and never panics on the engine's behalf.
    ///
    /// The process panic hook still runs before the panic is caught here, so
    /// an engine panic also reaches whatever the hook prints. `gsb` replaces
    /// the default hook with one that logs through `tracing`.
    pub fn process(&self, member: Member) -> Outcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.score_member(&member.id)
        }));

        match result {
            Ok(Ok(GoalAssessment::Scored(score))) => {
                tracing::debug!(member_id = %member.id, score = score.value, "goal score computed");
                Outcome::success(member)
            }
            Ok(Ok(GoalAssessment::NoApplicableGoal)) => {
                tracing::debug!(member_id = %member.id, "no applicable goal, skipping");
                Outcome::skipped(member, NO_GOAL_REASON)
            }
            Ok(Err(e)) => {
                tracing::error!(member_id = %member.id, error = %e, "goal score calculation failed");
                Outcome::failed(member, e.message)
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(member_id = %member.id, %reason, "goal engine panicked");
                Outcome::failed(member, reason)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("goal engine panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("goal engine panicked: {s}")
    } else {
        "goal engine panicked".to_string()
    }
}
