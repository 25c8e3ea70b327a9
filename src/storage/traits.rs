//! Collaborator store contracts.
//!
//! The resolution core reads and writes the graph through these traits only.
//! In-memory implementations live in [`super::memory`]; a graph database
//! adapter implements the same contracts.

use serde::{Deserialize, Serialize};

use crate::entity::{Endpoint, Entity, EntityId, Relationship, RelationshipId};
use crate::error::StorageError;
use crate::extraction::{ExtractionJob, ExtractionJobId};
use crate::merge::{MergeHistory, MergeHistoryId};

/// One referential pointer moved from `from` to `to` during a merge.
///
/// Recorded in the merge history so undo can move it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerRewrite {
    pub target: PointerTarget,
    pub from: EntityId,
    pub to: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerTarget {
    Relationship {
        id: RelationshipId,
        endpoint: Endpoint,
    },
    ExtractionJob {
        id: ExtractionJobId,
        slot: usize,
    },
}

/// An optimistic merge commit.
///
/// Applied atomically only if both entities still carry the expected versions.
#[derive(Debug, Clone)]
pub struct MergeCommit {
    /// Combined record; its id is the primary's id.
    pub merged: Entity,
    pub expected_primary_version: u64,
    pub duplicate: EntityId,
    pub expected_duplicate_version: u64,
    /// Keep the duplicate as a tombstone instead of erasing it.
    pub soft_delete: bool,
}

/// Outcome of [`EntityStore::commit_merge`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The merged entity as stored (version bumped).
    Committed(Entity),
    /// Another writer got there first.
    Stale {
        id: EntityId,
        expected: u64,
        actual: u64,
    },
}

/// Versioned entity storage.
///
/// Implementations must be safe for concurrent use.
pub trait EntityStore: Send + Sync {
    /// Insert a new entity. Fails if the id exists, live or tombstoned.
    fn insert(&self, entity: Entity) -> Result<(), StorageError>;

    /// Get a live entity. A merged-away id resolves to the entity it was merged into.
    fn get(&self, id: EntityId) -> Result<Option<Entity>, StorageError>;

    /// Replace an entity. The new version must be higher than the stored one.
    fn update(&self, entity: Entity) -> Result<(), StorageError>;

    /// Live entities whose canonical name or any variant normalizes to `name`.
    fn find_by_name(&self, name: &str) -> Result<Vec<Entity>, StorageError>;

    /// Every live entity, for corpus scans.
    fn list(&self) -> Result<Vec<Entity>, StorageError>;

    /// Atomically store a merge result and retire the duplicate.
    fn commit_merge(&self, commit: MergeCommit) -> Result<CommitOutcome, StorageError>;

    /// Undo a soft-delete merge: put `primary` back and revive the tombstoned
    /// `duplicate`. Both get a fresh version number.
    fn restore(&self, primary: Entity, duplicate: Entity) -> Result<(Entity, Entity), StorageError>;

    /// True if `id` was merged away with soft delete.
    fn is_tombstoned(&self, id: EntityId) -> Result<bool, StorageError>;

    /// Snapshot of an exact version, if recorded.
    fn get_at_version(&self, id: EntityId, version: u64) -> Result<Option<Entity>, StorageError>;

    /// All recorded versions, ascending.
    fn list_versions(&self, id: EntityId) -> Result<Vec<Entity>, StorageError>;
}

/// Relationship storage with pointer rewriting.
pub trait RelationshipStore: Send + Sync {
    fn insert(&self, relationship: Relationship) -> Result<(), StorageError>;

    fn get(&self, id: RelationshipId) -> Result<Option<Relationship>, StorageError>;

    /// Relationships with either end at `id`.
    fn find_by_entity(&self, id: EntityId) -> Result<Vec<Relationship>, StorageError>;

    /// Point every endpoint at `from` to `to`, returning each change.
    fn repoint(&self, from: EntityId, to: EntityId) -> Result<Vec<PointerRewrite>, StorageError>;

    /// Reverse rewrites. Verifies every pointer still holds its rewritten
    /// value before changing any; fails without changes otherwise.
    fn revert(&self, rewrites: &[PointerRewrite]) -> Result<usize, StorageError>;
}

/// Extraction job storage with pointer rewriting.
pub trait ExtractionJobStore: Send + Sync {
    fn insert(&self, job: ExtractionJob) -> Result<(), StorageError>;

    fn get(&self, id: ExtractionJobId) -> Result<Option<ExtractionJob>, StorageError>;

    /// Same contract as [`RelationshipStore::repoint`].
    fn repoint(&self, from: EntityId, to: EntityId) -> Result<Vec<PointerRewrite>, StorageError>;

    /// Same contract as [`RelationshipStore::revert`].
    fn revert(&self, rewrites: &[PointerRewrite]) -> Result<usize, StorageError>;
}

/// Append-only merge log.
pub trait MergeHistoryStore: Send + Sync {
    /// Append an entry. Fails if the id already exists.
    fn append(&self, entry: MergeHistory) -> Result<(), StorageError>;

    fn get(&self, id: MergeHistoryId) -> Result<Option<MergeHistory>, StorageError>;

    /// Stamp an entry as undone. Returns false if it already was.
    fn mark_undone(&self, id: MergeHistoryId) -> Result<bool, StorageError>;

    /// Entries naming `id` as primary or duplicate, oldest first.
    fn find_by_entity(&self, id: EntityId) -> Result<Vec<MergeHistory>, StorageError>;
}
