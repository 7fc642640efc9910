// cursor.rs - MemberCursor: lazy, single-use iteration over one run's members.
//
// The state machine:
//   Uninitialized --first pull--> Loaded --last member served--> Exhausted
//   Uninitialized --first pull, empty list--> Exhausted
// There is no way out of Exhausted. The member list is fetched once, on the
// first pull, and that snapshot is what the run sees even if the store
// changes underneath it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{BatchError, Result};
use crate::member::{Member, MemberSource};

/// Where a cursor is in its lifecycle.
#[derive(Debug)]
pub enum CursorState {
    /// Nothing fetched yet.
    Uninitialized,

    /// Snapshot fetched; `position` members already handed out.
    Loaded {
        members: std::vec::IntoIter<Member>,
        position: usize,
        total: usize,
    },

    /// Every member has been served (or there were none).
    Exhausted,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorState::Uninitialized => write!(f, "uninitialized"),
            CursorState::Loaded { .. } => write!(f, "loaded"),
            CursorState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Pull-based cursor over the members active since `since`.
///
/// Owned by exactly one run. Not `Sync`-shared: the pipeline pulls from a
/// single coordinating thread even when scoring is fanned out to a pool.
pub struct MemberCursor {
    source: Arc<dyn MemberSource>,
    since: DateTime<Utc>,
    state: CursorState,
}

impl MemberCursor {
    pub fn new(source: Arc<dyn MemberSource>, since: DateTime<Utc>) -> Self {
        Self {
            source,
            since,
            state: CursorState::Uninitialized,
        }
    }

    /// Return the next member, or `None` once the snapshot is used up.
    ///
    /// Fails with `SourceUnavailable` only when the initial fetch fails; the
    /// cursor is then exhausted and will not query the source again.
    pub fn next_member(&mut self) -> Result<Option<Member>> {
        let state = std::mem::replace(&mut self.state, CursorState::Exhausted);
        let (next_state, member) = match state {
            CursorState::Uninitialized => {
                let members = self
                    .source
                    .find_active_members(self.since)
                    .map_err(BatchError::SourceUnavailable)?;
                tracing::info!(
                    since = %self.since,
                    members = members.len(),
                    "member cursor loaded active members"
                );
                if members.is_empty() {
                    tracing::warn!("no active members found, nothing to score");
                    return Ok(None);
                }
                let total = members.len();
                Self::serve(members.into_iter(), 0, total)
            }
            CursorState::Loaded {
                members,
                position,
                total,
            } => Self::serve(members, position, total),
            CursorState::Exhausted => (CursorState::Exhausted, None),
        };
        self.state = next_state;
        Ok(member)
    }

    fn serve(
        mut members: std::vec::IntoIter<Member>,
        position: usize,
        total: usize,
    ) -> (CursorState, Option<Member>) {
        match members.next() {
            Some(member) => {
                let position = position + 1;
                let state = if position == total {
                    CursorState::Exhausted
                } else {
                    CursorState::Loaded {
                        members,
                        position,
                        total,
                    }
                };
                (state, Some(member))
            }
            None => (CursorState::Exhausted, None),
        }
    }

    /// Pull up to `max` members, stopping early at end of stream.
    pub fn next_batch(&mut self, max: usize) -> Result<Vec<Member>> {
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            match self.next_member()? {
                Some(member) => batch.push(member),
                None => break,
            }
        }
        Ok(batch)
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }

    /// Members handed out so far, when loaded.
    pub fn position(&self) -> Option<usize> {
        match &self.state {
            CursorState::Loaded { position, .. } => Some(*position),
            _ => None,
        }
    }
}
