// tick.rs - `gsb tick`: fire the scheduled trigger once.

use chrono::{Local, NaiveDate};

use crate::commands::{build_runtime, build_trigger};
use crate::config::AppConfig;

pub fn execute(config: &AppConfig, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let runtime = build_runtime()?;
    let trigger = build_trigger(config, runtime.handle().clone())?;

    let today = date.unwrap_or_else(|| Local::now().date_naive());
    let outcome = trigger.on_schedule(today);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
