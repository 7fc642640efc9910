//! # gs-trigger
//!
//! When goal score runs happen.
//!
//! ## Key components
//!
//! - [`should_run_today`]: the last-day-of-month gate
//! - [`ScoreTrigger`]: scheduled (gated, synchronous) and manual
//!   (ungated, background) entry points, both recording run metrics
//! - [`run_daily`]: the daily tick loop at a configured local time

pub mod error;
pub mod gate;
pub mod schedule;
pub mod trigger;

pub use error::TriggerError;
pub use gate::{last_day_of_month, should_run_today};
pub use schedule::{next_fire_after, run_daily, ScheduleConfig};
pub use trigger::{Acknowledgement, ScoreTrigger, TriggerKind, TriggerOutcome};
