// members.rs - JsonMemberStore: the member directory as a JSON file.
//
// The file holds an array of `{"id": "...", "last_active_at": "<RFC 3339>"}`
// records. Every query re-reads the file, so edits between runs are picked
// up without a restart.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gs_batch::{Member, MemberSource, SourceError};

use crate::error::{ConnectorError, Result};

/// Where the member directory lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembersConfig {
    #[serde(default = "default_members_path")]
    pub path: PathBuf,
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            path: default_members_path(),
        }
    }
}

fn default_members_path() -> PathBuf {
    PathBuf::from("members.json")
}

pub struct JsonMemberStore {
    path: PathBuf,
}

impl JsonMemberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &MembersConfig) -> Self {
        Self::new(config.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every member in the file, in file order.
    pub fn load(&self) -> Result<Vec<Member>> {
        let content = fs::read_to_string(&self.path).map_err(|source| ConnectorError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConnectorError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Members active at or after `since`, in file order.
    pub fn active_since(&self, since: DateTime<Utc>) -> Result<Vec<Member>> {
        let members: Vec<Member> = self
            .load()?
            .into_iter()
            .filter(|m| m.last_active_at >= since)
            .collect();
        tracing::debug!(path = %self.path.display(), %since, count = members.len(), "loaded active members");
        Ok(members)
    }
}

impl MemberSource for JsonMemberStore {
    fn find_active_members(&self, since: DateTime<Utc>) -> std::result::Result<Vec<Member>, SourceError> {
        self.active_since(since)
            .map_err(|e| SourceError::new(e.to_string()))
    }
}
