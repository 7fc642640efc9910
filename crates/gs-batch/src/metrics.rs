// metrics.rs - Metrics sinks: named counters and gauges with optional tags.
//
// The chunk writer emits per-status deltas, the trigger emits run-level
// counters and start/end gauges. A sink is just somewhere to put those
// numbers: an in-memory registry (tests, CLI summaries), a JSONL file, or a
// fan-out over several sinks.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Metric names shared by the writer and the trigger.
pub mod names {
    pub const GOAL_SCORE_SUCCESS: &str = "batch.goal_score.success";
    pub const GOAL_SCORE_SKIPPED: &str = "batch.goal_score.skipped";
    pub const GOAL_SCORE_FAILED: &str = "batch.goal_score.failed";

    pub const JOB_STARTED: &str = "async.job.started";
    pub const JOB_COMPLETED: &str = "async.job.completed";
    pub const JOB_FAILED: &str = "async.job.failed";
    pub const JOB_START_TIME: &str = "async.job.start.time";
    pub const JOB_END_TIME: &str = "async.job.end.time";
    pub const JOB_DURATION: &str = "async.job.duration";

    /// Value of the `job` tag on run-level metrics.
    pub const JOB_TAG: &str = "goal-score-calculation";
}

/// A `(key, value)` tag attached to an observation.
pub type Tag<'a> = (&'a str, &'a str);

/// Receives metric observations.
///
/// Errors mean the sink is unavailable; the chunk writer treats that as
/// fatal to the run, the trigger only logs it.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &str, delta: u64, tags: &[Tag<'_>]) -> Result<(), SinkError>;

    fn set_gauge(&self, name: &str, value: i64, tags: &[Tag<'_>]) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MetricKey {
    name: String,
    tags: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, tags: &[Tag<'_>]) -> Self {
        let mut tags: Vec<(String, String)> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        tags.sort();
        Self {
            name: name.to_string(),
            tags,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    counters: BTreeMap<MetricKey, u64>,
    gauges: BTreeMap<MetricKey, i64>,
}

/// In-process metrics registry.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    registry: Mutex<Registry>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter; 0 if never incremented.
    pub fn counter(&self, name: &str, tags: &[Tag<'_>]) -> u64 {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .counters
            .get(&MetricKey::new(name, tags))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter across every tag combination.
    pub fn counter_total(&self, name: &str) -> u64 {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .counters
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, value)| *value)
            .sum()
    }

    pub fn gauge(&self, name: &str, tags: &[Tag<'_>]) -> Option<i64> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.gauges.get(&MetricKey::new(name, tags)).copied()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment_counter(&self, name: &str, delta: u64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| SinkError::new("metrics registry lock poisoned"))?;
        *registry
            .counters
            .entry(MetricKey::new(name, tags))
            .or_insert(0) += delta;
        Ok(())
    }

    fn set_gauge(&self, name: &str, value: i64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| SinkError::new("metrics registry lock poisoned"))?;
        registry.gauges.insert(MetricKey::new(name, tags), value);
        Ok(())
    }
}

/// One line of the JSONL metrics log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricEvent {
    Counter {
        name: String,
        delta: u64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        tags: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    },
    Gauge {
        name: String,
        value: i64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        tags: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    },
}

/// Appends every observation as a JSON line to a file.
pub struct JsonlMetricsSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMetricsSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &MetricEvent) -> Result<(), SinkError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| SinkError::new("metrics log lock poisoned"))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SinkError::new(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::new(format!("cannot open {}: {}", self.path.display(), e)))?;

        let json = serde_json::to_string(event).map_err(|e| SinkError::new(e.to_string()))?;
        writeln!(file, "{}", json)
            .map_err(|e| SinkError::new(format!("cannot write {}: {}", self.path.display(), e)))?;
        Ok(())
    }

    /// Read back every event in the log, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<MetricEvent>, SinkError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SinkError::new(format!("cannot read {}: {}", path.display(), e)))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| SinkError::new(e.to_string())))
            .collect()
    }
}

fn tag_map(tags: &[Tag<'_>]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl MetricsSink for JsonlMetricsSink {
    fn increment_counter(&self, name: &str, delta: u64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        self.append(&MetricEvent::Counter {
            name: name.to_string(),
            delta,
            tags: tag_map(tags),
            timestamp: Utc::now(),
        })
    }

    fn set_gauge(&self, name: &str, value: i64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        self.append(&MetricEvent::Gauge {
            name: name.to_string(),
            value,
            tags: tag_map(tags),
            timestamp: Utc::now(),
        })
    }
}

/// Forwards each observation to several sinks.
///
/// A failing sink is logged and skipped; the fan-out itself only fails when
/// every sink failed.
#[derive(Default)]
pub struct FanoutMetrics {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn forward(
        &self,
        name: &str,
        record: impl Fn(&dyn MetricsSink) -> Result<(), SinkError>,
    ) -> Result<(), SinkError> {
        let mut last_error = None;
        let mut delivered = 0usize;
        for sink in &self.sinks {
            match record(sink.as_ref()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "metrics sink error");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

impl MetricsSink for FanoutMetrics {
    fn increment_counter(&self, name: &str, delta: u64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        self.forward(name, |sink| sink.increment_counter(name, delta, tags))
    }

    fn set_gauge(&self, name: &str, value: i64, tags: &[Tag<'_>]) -> Result<(), SinkError> {
        self.forward(name, |sink| sink.set_gauge(name, value, tags))
    }
}
