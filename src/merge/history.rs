//! Merge history records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, EntityId};
use crate::merge::conflict::MergeConflict;
use crate::storage::PointerRewrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeHistoryId(Uuid);

impl MergeHistoryId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MergeHistoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MergeHistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to undo one merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeHistory {
    pub id: MergeHistoryId,
    pub primary_id: EntityId,
    pub duplicate_id: EntityId,
    /// Both records exactly as they were before the merge.
    pub pre_merge_primary: Entity,
    pub pre_merge_duplicate: Entity,
    /// Version of the primary written by the merge.
    pub merged_version: u64,
    pub conflicts_resolved: Vec<MergeConflict>,
    pub pointer_rewrites: Vec<PointerRewrite>,
    pub soft_delete: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undone_at: Option<DateTime<Utc>>,
}

impl MergeHistory {
    #[must_use]
    pub const fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }

    /// True if the entry mentions `id` on either side.
    #[must_use]
    pub fn involves(&self, id: EntityId) -> bool {
        self.primary_id == id || self.duplicate_id == id
    }
}
