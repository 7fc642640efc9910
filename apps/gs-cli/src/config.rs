// config.rs - gsb.toml: one file for every section of the batch.
//
// Every section and field is optional. A missing file means all defaults.
//
// Example:
//
//   [batch]
//   chunk_size = 10
//   active_window_months = 3
//
//   [pool]
//   enabled = true
//   core_workers = 5
//   max_workers = 10
//
//   [schedule]
//   hour = 2
//   minute = 0
//
//   [members]
//   path = "data/members.json"
//
//   [engine]
//   program = "bin/goal-engine"
//   args = ["--ledger", "prod"]
//
//   [metrics]
//   events_log = "logs/metrics.jsonl"

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use gs_batch::{BatchSettings, PoolConfig};
use gs_connectors::{EngineConfig, MembersConfig};
use gs_trigger::ScheduleConfig;

pub const DEFAULT_CONFIG_FILE: &str = "gsb.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub batch: BatchSettings,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub members: MembersConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Append every metric observation to this JSONL file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_log: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.batch.validate().context("invalid [batch] section")?;
        if self.pool.enabled {
            self.pool.validate().context("invalid [pool] section")?;
        }
        self.schedule.validate().context("invalid [schedule] section")?;
        if self.engine.program.trim().is_empty() {
            anyhow::bail!("invalid [engine] section: program must not be empty");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to render config as TOML")
    }
}
