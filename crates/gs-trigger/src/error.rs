// error.rs - Error types for the trigger layer.
//
// Run failures are not errors here: the trigger absorbs them into a
// `TriggerOutcome::Failed` and a metric. Only setup problems surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    /// The configured daily fire time is not a valid time of day.
    #[error("invalid schedule time {hour:02}:{minute:02}")]
    InvalidSchedule { hour: u32, minute: u32 },
}
