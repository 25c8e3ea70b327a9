//! In-memory storage backend.
//!
//! Thread-safe implementations of the collaborator store traits, for embedded
//! use, tests and as a reference for real adapters.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;

use crate::entity::{Endpoint, Entity, EntityId, Relationship, RelationshipId};
use crate::error::StorageError;
use crate::extraction::{ExtractionJob, ExtractionJobId};
use crate::fuzzy::normalize_name;
use crate::merge::{MergeHistory, MergeHistoryId};
use crate::storage::traits::{
    CommitOutcome, EntityStore, ExtractionJobStore, MergeCommit, MergeHistoryStore,
    PointerRewrite, PointerTarget, RelationshipStore,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct EntityState {
    by_id: HashMap<EntityId, Entity>,
    by_name: HashMap<String, HashSet<EntityId>>,
    versions: HashMap<EntityId, BTreeMap<u64, Entity>>,
    merged_into: HashMap<EntityId, EntityId>,
    tombstones: HashMap<EntityId, Entity>,
}

impl EntityState {
    fn resolve_canonical_id(&self, id: EntityId) -> Result<EntityId, StorageError> {
        let mut current = id;
        for _ in 0..128 {
            let Some(next) = self.merged_into.get(&current).copied() else {
                return Ok(current);
            };
            if next == current {
                return Err(StorageError::BackendError(
                    "entity merge map contains a self-cycle".to_string(),
                ));
            }
            current = next;
        }
        Err(StorageError::BackendError(
            "entity merge map resolution exceeded hop limit".to_string(),
        ))
    }

    fn index_names(&mut self, entity: &Entity) {
        for name in entity.all_names() {
            let key = normalize_name(name);
            if !key.is_empty() {
                self.by_name.entry(key).or_default().insert(entity.id());
            }
        }
    }

    fn unindex_names(&mut self, entity: &Entity) {
        for name in entity.all_names() {
            let key = normalize_name(name);
            if let Some(set) = self.by_name.get_mut(&key) {
                set.remove(&entity.id());
                if set.is_empty() {
                    self.by_name.remove(&key);
                }
            }
        }
    }

    fn record_version(
        &mut self,
        entity: &Entity,
        context: &'static str,
    ) -> Result<(), StorageError> {
        let versions = self.versions.entry(entity.id()).or_default();
        if versions.contains_key(&entity.version) {
            return Err(StorageError::BackendError(format!(
                "duplicate entity version ({context}): id={} version={}",
                entity.id(),
                entity.version
            )));
        }
        versions.insert(entity.version, entity.clone());
        Ok(())
    }

    fn next_version(&self, id: EntityId) -> Result<u64, StorageError> {
        let latest = self
            .versions
            .get(&id)
            .and_then(|v| v.keys().next_back().copied())
            .unwrap_or(0);
        latest
            .checked_add(1)
            .ok_or_else(|| StorageError::BackendError("entity version overflow".to_string()))
    }

    fn live_version(&self, id: EntityId) -> u64 {
        self.by_id.get(&id).map_or(0, |e| e.version)
    }
}

/// Thread-safe in-memory entity store.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: RwLock<EntityState>,
}

impl InMemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn insert(&self, entity: Entity) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.insert"))?;
        let id = entity.id();
        if state.by_id.contains_key(&id)
            || state.merged_into.contains_key(&id)
            || state.tombstones.contains_key(&id)
        {
            return Err(StorageError::DuplicateKey(id.to_string()));
        }
        state.record_version(&entity, "entity.insert")?;
        state.index_names(&entity);
        state.by_id.insert(id, entity);
        Ok(())
    }

    fn get(&self, id: EntityId) -> Result<Option<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.get"))?;
        let canonical = state.resolve_canonical_id(id)?;
        Ok(state.by_id.get(&canonical).cloned())
    }

    fn update(&self, entity: Entity) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.update"))?;
        let id = entity.id();
        let prev = state
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::BackendError(format!("entity not live: {id}")))?;

        if entity.version <= prev.version {
            return Err(StorageError::BackendError(format!(
                "entity version must increase on update: id={id} prev={} new={}",
                prev.version, entity.version
            )));
        }

        state.record_version(&entity, "entity.update")?;
        state.unindex_names(&prev);
        state.index_names(&entity);
        state.by_id.insert(id, entity);
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<Entity>, StorageError> {
        let key = normalize_name(name);
        let state = self.state.read().map_err(|_| lock_err("entity.find_by_name"))?;
        let Some(ids) = state.by_name.get(&key) else {
            return Ok(Vec::new());
        };
        let mut results: Vec<Entity> = ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect();
        results.sort_by(|a, b| {
            a.canonical_name
                .cmp(&b.canonical_name)
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(results)
    }

    fn list(&self) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.list"))?;
        let mut all: Vec<Entity> = state.by_id.values().cloned().collect();
        all.sort_by(|a, b| {
            a.canonical_name
                .cmp(&b.canonical_name)
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(all)
    }

    fn commit_merge(&self, commit: MergeCommit) -> Result<CommitOutcome, StorageError> {
        let MergeCommit {
            mut merged,
            expected_primary_version,
            duplicate,
            expected_duplicate_version,
            soft_delete,
        } = commit;
        let primary = merged.id();
        if primary == duplicate {
            return Err(StorageError::BackendError(
                "cannot merge an entity into itself".to_string(),
            ));
        }

        let mut state = self.state.write().map_err(|_| lock_err("entity.commit_merge"))?;

        for (id, expected) in [
            (primary, expected_primary_version),
            (duplicate, expected_duplicate_version),
        ] {
            let actual = state.live_version(id);
            if actual != expected {
                return Ok(CommitOutcome::Stale {
                    id,
                    expected,
                    actual,
                });
            }
        }

        let prev_primary = state
            .by_id
            .get(&primary)
            .cloned()
            .ok_or_else(|| StorageError::BackendError(format!("entity not live: {primary}")))?;
        let dup_entity = state
            .by_id
            .remove(&duplicate)
            .ok_or_else(|| StorageError::BackendError(format!("entity not live: {duplicate}")))?;

        merged.version = state.next_version(primary)?;
        merged.provenance.updated_at = Utc::now();
        state.record_version(&merged, "entity.commit_merge")?;

        state.unindex_names(&prev_primary);
        state.unindex_names(&dup_entity);
        state.index_names(&merged);
        state.by_id.insert(primary, merged.clone());
        state.merged_into.insert(duplicate, primary);
        if soft_delete {
            state.tombstones.insert(duplicate, dup_entity);
        } else {
            state.versions.remove(&duplicate);
        }

        Ok(CommitOutcome::Committed(merged))
    }

    fn restore(
        &self,
        primary: Entity,
        duplicate: Entity,
    ) -> Result<(Entity, Entity), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.restore"))?;
        let primary_id = primary.id();
        let duplicate_id = duplicate.id();

        let current = state.by_id.get(&primary_id).cloned().ok_or_else(|| {
            StorageError::BackendError(format!("cannot restore {primary_id}: not live"))
        })?;
        if !state.tombstones.contains_key(&duplicate_id) {
            return Err(StorageError::BackendError(format!(
                "cannot restore {duplicate_id}: no tombstone"
            )));
        }
        if state.merged_into.get(&duplicate_id) != Some(&primary_id) {
            return Err(StorageError::BackendError(format!(
                "cannot restore {duplicate_id}: not merged into {primary_id}"
            )));
        }

        let mut restored_primary = primary;
        restored_primary.version = state.next_version(primary_id)?;
        let mut restored_duplicate = duplicate;
        restored_duplicate.version = state.next_version(duplicate_id)?;

        state.record_version(&restored_primary, "entity.restore")?;
        state.record_version(&restored_duplicate, "entity.restore")?;

        state.unindex_names(&current);
        state.index_names(&restored_primary);
        state.index_names(&restored_duplicate);
        state.tombstones.remove(&duplicate_id);
        state.merged_into.remove(&duplicate_id);
        state.by_id.insert(primary_id, restored_primary.clone());
        state.by_id.insert(duplicate_id, restored_duplicate.clone());

        Ok((restored_primary, restored_duplicate))
    }

    fn is_tombstoned(&self, id: EntityId) -> Result<bool, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.is_tombstoned"))?;
        Ok(state.tombstones.contains_key(&id))
    }

    fn get_at_version(&self, id: EntityId, version: u64) -> Result<Option<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.get_at_version"))?;
        Ok(state
            .versions
            .get(&id)
            .and_then(|m| m.get(&version))
            .cloned())
    }

    fn list_versions(&self, id: EntityId) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.list_versions"))?;
        Ok(state
            .versions
            .get(&id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Thread-safe in-memory relationship store.
#[derive(Debug, Default)]
pub struct InMemoryRelationshipStore {
    state: RwLock<BTreeMap<RelationshipId, Relationship>>,
}

impl InMemoryRelationshipStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelationshipStore for InMemoryRelationshipStore {
    fn insert(&self, relationship: Relationship) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("relationship.insert"))?;
        if state.contains_key(&relationship.id) {
            return Err(StorageError::DuplicateKey(relationship.id.to_string()));
        }
        state.insert(relationship.id, relationship);
        Ok(())
    }

    fn get(&self, id: RelationshipId) -> Result<Option<Relationship>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("relationship.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn find_by_entity(&self, id: EntityId) -> Result<Vec<Relationship>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("relationship.find_by_entity"))?;
        Ok(state.values().filter(|r| r.touches(id)).cloned().collect())
    }

    fn repoint(&self, from: EntityId, to: EntityId) -> Result<Vec<PointerRewrite>, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("relationship.repoint"))?;
        let mut rewrites = Vec::new();
        for rel in state.values_mut() {
            for endpoint in [Endpoint::Subject, Endpoint::Object] {
                if rel.endpoint(endpoint) == from {
                    rel.set_endpoint(endpoint, to);
                    rewrites.push(PointerRewrite {
                        target: PointerTarget::Relationship {
                            id: rel.id,
                            endpoint,
                        },
                        from,
                        to,
                    });
                }
            }
        }
        Ok(rewrites)
    }

    fn revert(&self, rewrites: &[PointerRewrite]) -> Result<usize, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("relationship.revert"))?;
        let mut planned = Vec::new();
        for rewrite in rewrites {
            let PointerTarget::Relationship { id, endpoint } = rewrite.target else {
                continue;
            };
            let current = state
                .get(&id)
                .map(|r| r.endpoint(endpoint))
                .ok_or_else(|| StorageError::BackendError(format!("relationship {id} is gone")))?;
            if current != rewrite.to {
                return Err(StorageError::BackendError(format!(
                    "relationship {id} changed since merge: expected {}, found {current}",
                    rewrite.to
                )));
            }
            planned.push((id, endpoint, rewrite.from));
        }
        for (id, endpoint, original) in &planned {
            if let Some(rel) = state.get_mut(id) {
                rel.set_endpoint(*endpoint, *original);
            }
        }
        Ok(planned.len())
    }
}

/// Thread-safe in-memory extraction job store.
#[derive(Debug, Default)]
pub struct InMemoryExtractionJobStore {
    state: RwLock<BTreeMap<ExtractionJobId, ExtractionJob>>,
}

impl InMemoryExtractionJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExtractionJobStore for InMemoryExtractionJobStore {
    fn insert(&self, job: ExtractionJob) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("job.insert"))?;
        if state.contains_key(&job.id) {
            return Err(StorageError::DuplicateKey(job.id.to_string()));
        }
        state.insert(job.id, job);
        Ok(())
    }

    fn get(&self, id: ExtractionJobId) -> Result<Option<ExtractionJob>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("job.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn repoint(&self, from: EntityId, to: EntityId) -> Result<Vec<PointerRewrite>, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("job.repoint"))?;
        let mut rewrites = Vec::new();
        for job in state.values_mut() {
            for (slot, entity_id) in job.entity_ids.iter_mut().enumerate() {
                if *entity_id == from {
                    *entity_id = to;
                    rewrites.push(PointerRewrite {
                        target: PointerTarget::ExtractionJob { id: job.id, slot },
                        from,
                        to,
                    });
                }
            }
        }
        Ok(rewrites)
    }

    fn revert(&self, rewrites: &[PointerRewrite]) -> Result<usize, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("job.revert"))?;
        let mut planned = Vec::new();
        for rewrite in rewrites {
            let PointerTarget::ExtractionJob { id, slot } = rewrite.target else {
                continue;
            };
            let current = state
                .get(&id)
                .and_then(|job| job.entity_ids.get(slot).copied())
                .ok_or_else(|| {
                    StorageError::BackendError(format!("extraction job {id} slot {slot} is gone"))
                })?;
            if current != rewrite.to {
                return Err(StorageError::BackendError(format!(
                    "extraction job {id} slot {slot} changed since merge"
                )));
            }
            planned.push((id, slot, rewrite.from));
        }
        for (id, slot, original) in &planned {
            if let Some(entry) = state.get_mut(id).and_then(|j| j.entity_ids.get_mut(*slot)) {
                *entry = *original;
            }
        }
        Ok(planned.len())
    }
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: Vec<MergeHistory>,
    by_id: HashMap<MergeHistoryId, usize>,
}

/// Thread-safe in-memory merge log.
#[derive(Debug, Default)]
pub struct InMemoryMergeHistoryStore {
    state: RwLock<HistoryState>,
}

impl InMemoryMergeHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MergeHistoryStore for InMemoryMergeHistoryStore {
    fn append(&self, entry: MergeHistory) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("history.append"))?;
        if state.by_id.contains_key(&entry.id) {
            return Err(StorageError::DuplicateKey(entry.id.to_string()));
        }
        let idx = state.entries.len();
        state.by_id.insert(entry.id, idx);
        state.entries.push(entry);
        Ok(())
    }

    fn get(&self, id: MergeHistoryId) -> Result<Option<MergeHistory>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("history.get"))?;
        Ok(state.by_id.get(&id).map(|&idx| state.entries[idx].clone()))
    }

    fn mark_undone(&self, id: MergeHistoryId) -> Result<bool, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("history.mark_undone"))?;
        let idx = *state
            .by_id
            .get(&id)
            .ok_or_else(|| StorageError::BackendError(format!("merge history not found: {id}")))?;
        let entry = &mut state.entries[idx];
        if entry.undone_at.is_some() {
            return Ok(false);
        }
        entry.undone_at = Some(Utc::now());
        Ok(true)
    }

    fn find_by_entity(&self, id: EntityId) -> Result<Vec<MergeHistory>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("history.find_by_entity"))?;
        Ok(state.entries.iter().filter(|e| e.involves(id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Script};

    fn person(name: &str) -> Entity {
        Entity::new(name, EntityKind::person())
    }

    fn commit(merged: Entity, dup: &Entity, soft_delete: bool) -> MergeCommit {
        MergeCommit {
            expected_primary_version: merged.version,
            merged,
            duplicate: dup.id(),
            expected_duplicate_version: dup.version,
            soft_delete,
        }
    }

    #[test]
    fn test_insert_get_and_duplicate_key() {
        let store = InMemoryEntityStore::new();
        let e = person("Marpa");
        store.insert(e.clone()).unwrap();
        assert_eq!(store.get(e.id()).unwrap().unwrap().canonical_name, "Marpa");
        assert!(matches!(store.insert(e), Err(StorageError::DuplicateKey(_))));
        assert!(store.get(EntityId::new()).unwrap().is_none());
    }

    #[test]
    fn test_update_requires_higher_version() {
        let store = InMemoryEntityStore::new();
        let mut e = person("Tilopa");
        store.insert(e.clone()).unwrap();
        assert!(store.update(e.clone()).is_err());

        e.add_variant(Script::Sanskrit, "Tillipa");
        store.update(e.clone()).unwrap();
        assert_eq!(store.list_versions(e.id()).unwrap().len(), 2);
        assert_eq!(store.find_by_name("tillipa").unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_name_uses_variants_and_normalization() {
        let store = InMemoryEntityStore::new();
        let e = person("Marpa Lotsawa").with_variant(Script::Wylie, "mar pa");
        store.insert(e.clone()).unwrap();
        assert_eq!(store.find_by_name("MARPA").unwrap()[0].id(), e.id());
        assert_eq!(store.find_by_name("Mar-pa").unwrap()[0].id(), e.id());
        assert!(store.find_by_name("Milarepa").unwrap().is_empty());
    }

    #[test]
    fn test_commit_merge_soft_delete() {
        let store = InMemoryEntityStore::new();
        let a = person("Marpa");
        let b = person("Mar-pa");
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();

        let merged = a.clone().with_variant(Script::English, "Mar-pa");
        let CommitOutcome::Committed(stored) = store.commit_merge(commit(merged, &b, true)).unwrap()
        else {
            panic!("expected commit");
        };
        assert_eq!(stored.version, 2);
        assert!(store.is_tombstoned(b.id()).unwrap());
        assert_eq!(store.get(b.id()).unwrap().unwrap().id(), a.id());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_merge_detects_stale_version() {
        let store = InMemoryEntityStore::new();
        let a = person("Naropa");
        let b = person("Naro");
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();

        let mut newer = a.clone();
        newer.touch();
        store.update(newer).unwrap();

        let outcome = store.commit_merge(commit(a.clone(), &b, true)).unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Stale {
                id: a.id(),
                expected: 1,
                actual: 2
            }
        );
        assert!(!store.is_tombstoned(b.id()).unwrap());
    }

    #[test]
    fn test_hard_delete_leaves_no_tombstone() {
        let store = InMemoryEntityStore::new();
        let a = person("Gampopa");
        let b = person("Sgam po pa");
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();
        store.commit_merge(commit(a.clone(), &b, false)).unwrap();

        assert!(!store.is_tombstoned(b.id()).unwrap());
        assert!(store.list_versions(b.id()).unwrap().is_empty());
        assert!(store.restore(a, b).is_err());
    }

    #[test]
    fn test_restore_revives_duplicate() {
        let store = InMemoryEntityStore::new();
        let a = person("Marpa");
        let b = person("Mar-pa");
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();
        let merged = a.clone().with_variant(Script::English, "Mar-pa");
        store.commit_merge(commit(merged, &b, true)).unwrap();

        let (p, d) = store.restore(a.clone(), b.clone()).unwrap();
        assert_eq!(p.version, 3);
        assert_eq!(d.version, 2);
        assert!(p.name_variants.is_empty());
        assert!(!store.is_tombstoned(b.id()).unwrap());
        assert_eq!(store.get(b.id()).unwrap().unwrap().canonical_name, "Mar-pa");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_relationship_repoint_and_revert() {
        let store = InMemoryRelationshipStore::new();
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
        store.insert(Relationship::new(b, "teacher_of", c)).unwrap();
        store.insert(Relationship::new(c, "student_of", b)).unwrap();

        let rewrites = store.repoint(b, a).unwrap();
        assert_eq!(rewrites.len(), 2);
        assert!(store.find_by_entity(b).unwrap().is_empty());
        assert_eq!(store.find_by_entity(a).unwrap().len(), 2);

        assert_eq!(store.revert(&rewrites).unwrap(), 2);
        assert_eq!(store.find_by_entity(b).unwrap().len(), 2);
    }

    #[test]
    fn test_relationship_revert_refuses_drift() {
        let store = InMemoryRelationshipStore::new();
        let (a, b, c, d) = (EntityId::new(), EntityId::new(), EntityId::new(), EntityId::new());
        store.insert(Relationship::new(b, "teacher_of", c)).unwrap();
        let rewrites = store.repoint(b, a).unwrap();
        store.repoint(a, d).unwrap();

        assert!(store.revert(&rewrites).is_err());
        assert_eq!(store.find_by_entity(d).unwrap().len(), 1);
    }

    #[test]
    fn test_job_repoint_and_revert() {
        let store = InMemoryExtractionJobStore::new();
        let (a, b) = (EntityId::new(), EntityId::new());
        let job = ExtractionJob::new("blue-annals", vec![a, b, b]);
        let job_id = job.id;
        store.insert(job).unwrap();

        let rewrites = store.repoint(b, a).unwrap();
        assert_eq!(rewrites.len(), 2);
        assert_eq!(store.get(job_id).unwrap().unwrap().entity_ids, vec![a, a, a]);

        store.revert(&rewrites).unwrap();
        assert_eq!(store.get(job_id).unwrap().unwrap().entity_ids, vec![a, b, b]);
    }

    #[test]
    fn test_history_append_and_mark_undone() {
        let store = InMemoryMergeHistoryStore::new();
        let a = person("Marpa");
        let b = person("Mar-pa");
        let entry = MergeHistory {
            id: MergeHistoryId::new(),
            primary_id: a.id(),
            duplicate_id: b.id(),
            pre_merge_primary: a.clone(),
            pre_merge_duplicate: b.clone(),
            merged_version: 2,
            conflicts_resolved: Vec::new(),
            pointer_rewrites: Vec::new(),
            soft_delete: true,
            timestamp: Utc::now(),
            undone_at: None,
        };
        let id = entry.id;
        store.append(entry.clone()).unwrap();
        assert!(matches!(store.append(entry), Err(StorageError::DuplicateKey(_))));

        assert_eq!(store.find_by_entity(b.id()).unwrap().len(), 1);
        assert!(store.mark_undone(id).unwrap());
        assert!(!store.mark_undone(id).unwrap());
        assert!(store.get(id).unwrap().unwrap().is_undone());
        assert!(store.mark_undone(MergeHistoryId::new()).is_err());
    }
}
