// schedule.rs - The daily tick loop.
//
// Fires `ScoreTrigger::on_schedule` once a day at a fixed local time until
// the shutdown future resolves. The gate inside the trigger decides whether
// the tick actually runs anything.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::TriggerError;
use crate::trigger::{ScoreTrigger, TriggerOutcome};

/// Local time of day for the daily tick. Defaults to 02:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
        }
    }
}

impl ScheduleConfig {
    pub fn fire_time(&self) -> Result<NaiveTime, TriggerError> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or(TriggerError::InvalidSchedule {
            hour: self.hour,
            minute: self.minute,
        })
    }

    pub fn validate(&self) -> Result<(), TriggerError> {
        self.fire_time().map(|_| ())
    }
}

// Serde default functions

fn default_hour() -> u32 {
    2
}

// Longest clock jump forward any zone makes in one transition.
const MAX_GAP_MINUTES: i64 = 180;

/// The first instant strictly after `now` whose wall-clock time in `now`'s
/// zone is `at`.
///
/// On a day when `at` is repeated (clocks go back) the earlier of the two
/// instants fires. On a day when `at` is skipped (clocks go forward) the tick
/// fires at the first wall-clock time after the gap.
pub fn next_fire_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let zone = now.timezone();
    let today = now.date_naive();
    (0..=2)
        .filter_map(|ahead| today.checked_add_days(Days::new(ahead)))
        .filter_map(|day| resolve_local(&zone, day.and_time(at)))
        .find(|fire| fire > now)
        .unwrap_or_else(|| now.clone() + ChronoDuration::days(1))
}

fn resolve_local<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=MAX_GAP_MINUTES).find_map(|minutes| {
        zone.from_local_datetime(&(local + ChronoDuration::minutes(minutes)))
            .earliest()
    })
}

/// Tick daily at `schedule` until `shutdown` resolves.
///
/// A run in progress when shutdown arrives is allowed to finish; the loop
/// only checks for shutdown while waiting for the next tick.
pub async fn run_daily<F>(
    trigger: Arc<ScoreTrigger>,
    schedule: ScheduleConfig,
    shutdown: F,
) -> Result<(), TriggerError>
where
    F: Future<Output = ()>,
{
    let at = schedule.fire_time()?;
    tokio::pin!(shutdown);

    loop {
        let now = Local::now();
        let next = next_fire_after(&now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(next_tick = %next, "waiting for next goal score tick");

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("daily schedule stopped");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let today = Local::now().date_naive();
        let tick = Arc::clone(&trigger);
        match tokio::task::spawn_blocking(move || tick.on_schedule(today)).await {
            Ok(TriggerOutcome::Failed { reason }) => {
                tracing::warn!(%today, %reason, "scheduled goal score run failed");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(%today, error = %e, "scheduled tick task did not finish"),
        }
    }
}
