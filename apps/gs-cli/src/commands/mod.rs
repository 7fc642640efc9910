// mod.rs - Subcommands and the wiring they share.

pub mod daemon;
pub mod run;
pub mod show_config;
pub mod tick;

use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::{Handle, Runtime};

use gs_batch::{GoalScoreWriter, JsonlMetricsSink, MetricsSink, RunCounters, ScoreJob};
use gs_connectors::{CommandGoalEngine, JsonMemberStore};
use gs_trigger::ScoreTrigger;

use crate::config::AppConfig;

pub(crate) fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gsb-runtime")
        .build()
        .context("failed to start async runtime")
}

/// The JSONL event log, when one is configured.
///
/// The log is the only sink, so a log that cannot be written fails the run
/// at the first chunk commit.
pub(crate) fn build_metrics(config: &AppConfig) -> Option<Arc<dyn MetricsSink>> {
    config.metrics.events_log.as_ref().map(|path| {
        tracing::info!(path = %path.display(), "recording metrics to event log");
        Arc::new(JsonlMetricsSink::new(path)) as Arc<dyn MetricsSink>
    })
}

pub(crate) fn build_job(
    config: &AppConfig,
    metrics: Option<Arc<dyn MetricsSink>>,
) -> anyhow::Result<ScoreJob> {
    let mut writer = GoalScoreWriter::new(Arc::new(RunCounters::new()));
    if let Some(metrics) = metrics {
        writer = writer.with_metrics(metrics);
    }
    let job = ScoreJob::new(
        Arc::new(JsonMemberStore::from_config(&config.members)),
        Arc::new(CommandGoalEngine::new(config.engine.clone())),
        Arc::new(writer),
        config.batch.clone(),
    )?
    .with_pool(config.pool.clone())?;
    Ok(job)
}

pub(crate) fn build_trigger(config: &AppConfig, runtime: Handle) -> anyhow::Result<ScoreTrigger> {
    let metrics = build_metrics(config);
    let job = Arc::new(build_job(config, metrics.clone())?);
    Ok(match metrics {
        Some(metrics) => ScoreTrigger::new(job, metrics, runtime),
        None => ScoreTrigger::without_metrics(job, runtime),
    })
}
