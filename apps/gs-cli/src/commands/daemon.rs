// daemon.rs - `gsb daemon`: the daily tick loop, stopped by Ctrl-C.

use std::sync::Arc;

use gs_trigger::run_daily;

use crate::commands::{build_runtime, build_trigger};
use crate::config::AppConfig;

pub fn execute(config: &AppConfig, run_now: bool) -> anyhow::Result<()> {
    let runtime = build_runtime()?;
    let trigger = Arc::new(build_trigger(config, runtime.handle().clone())?);

    if run_now {
        let ack = trigger.run_now();
        tracing::info!(requested_at = %ack.requested_at, "{}", ack.message);
    }

    tracing::info!(
        hour = config.schedule.hour,
        minute = config.schedule.minute,
        "goal score daemon started"
    );
    runtime.block_on(run_daily(trigger, config.schedule, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }))?;
    Ok(())
}
