// run.rs - `gsb run`: a manual run, waited on.
//
// Goes through the same manual path as a background trigger (start metric,
// blocking task, completion metric) but blocks until the outcome is known
// and prints it as JSON.

use gs_trigger::TriggerOutcome;

use crate::commands::{build_runtime, build_trigger};
use crate::config::AppConfig;

pub fn execute(config: &AppConfig) -> anyhow::Result<()> {
    let runtime = build_runtime()?;
    let trigger = build_trigger(config, runtime.handle().clone())?;

    let (ack, handle) = trigger.dispatch();
    eprintln!("{}", ack);

    let outcome = runtime.block_on(handle)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    let counters = trigger.job().writer().snapshot();
    tracing::info!(
        success = counters.success,
        skipped = counters.skipped,
        failed = counters.failed,
        "cumulative goal score counters"
    );

    if let TriggerOutcome::Failed { reason } = outcome {
        anyhow::bail!("goal score run failed: {}", reason);
    }
    Ok(())
}
