// member.rs - Member entity and the Member Source collaborator.
//
// Members are owned by an external store. The engine only reads them: it
// asks the source for everyone active since a cutoff and scores each one.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Opaque member identity. The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A member as seen by the batch engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,

    /// Last time the member was active, e.g. last login.
    pub last_active_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, last_active_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            last_active_at,
        }
    }
}

/// Supplies the finite, ordered set of members eligible for a run.
///
/// Called at most once per run, by the cursor's first pull. The returned
/// order is the order members are visited in.
pub trait MemberSource: Send + Sync {
    fn find_active_members(&self, since: DateTime<Utc>) -> Result<Vec<Member>, SourceError>;
}

/// Start of the trailing activity window ending at `now`.
///
/// Calendar months, so 2024-05-31 minus 3 months is 2024-02-29.
pub fn active_since(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
