//! Committed merges and their undo.
//!
//! A merge loads both entities, combines them, and commits through
//! [`EntityStore::commit_merge`](crate::storage::EntityStore::commit_merge),
//! which applies only if neither entity changed since it was read. A stale
//! commit reloads and retries. After the commit, relationship and extraction
//! job pointers move from the duplicate to the primary and the history entry
//! is appended. If either step fails, a soft-delete merge is rolled back to
//! the snapshots it was built from.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{DetectionOptions, MergeOptions};
use crate::confidence::Confidence;
use crate::detection::{ConfidenceLevel, DuplicateDetector, DuplicateScore};
use crate::entity::{Entity, EntityId};
use crate::error::{
    ConflictError, NotFoundError, ResolveError, ResolveResult, StorageError, ValidationError,
};
use crate::merge::combine::{combine, CombinedEntity};
use crate::merge::conflict::{ConflictSeverity, MergeConflict};
use crate::merge::history::{MergeHistory, MergeHistoryId};
use crate::storage::{CommitOutcome, MergeCommit, PointerRewrite, PointerTarget, Stores};
use crate::TARGET_MERGE;

/// Overall judgement of a proposed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl MergeQuality {
    const fn from_level(level: ConfidenceLevel) -> Self {
        match level {
            ConfidenceLevel::VeryHigh => Self::Excellent,
            ConfidenceLevel::High => Self::Good,
            ConfidenceLevel::Medium => Self::Fair,
            ConfidenceLevel::Low => Self::Poor,
        }
    }

    const fn downgrade(self, steps: u8) -> Self {
        let rank = match self {
            Self::Excellent => 3u8,
            Self::Good => 2,
            Self::Fair => 1,
            Self::Poor => 0,
        };
        match rank.saturating_sub(steps) {
            3 => Self::Excellent,
            2 => Self::Good,
            1 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

impl fmt::Display for MergeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// What a merge would do, computed without writing anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePreview {
    pub primary_id: EntityId,
    pub duplicate_id: EntityId,
    /// `None` when the entities cannot be combined (different kinds).
    pub combined: Option<Entity>,
    pub conflicts: Vec<MergeConflict>,
    pub duplicate_score: DuplicateScore,
    pub estimated_confidence: Confidence,
    pub quality: MergeQuality,
    pub issues: Vec<String>,
    /// True if committing with the same options would fail on open conflicts.
    pub blocked: bool,
}

/// A committed merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged: Entity,
    pub history_id: MergeHistoryId,
    pub conflicts: Vec<MergeConflict>,
    pub pointer_rewrites: usize,
    /// Commit attempts used, including the successful one.
    pub attempts: u32,
}

/// Merges entities held in collaborator stores.
#[derive(Debug, Clone)]
pub struct EntityMerger {
    stores: Stores,
    detector: DuplicateDetector,
}

impl EntityMerger {
    #[must_use]
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            detector: DuplicateDetector::default(),
        }
    }

    #[must_use]
    pub const fn with_detector(mut self, detector: DuplicateDetector) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub const fn stores(&self) -> &Stores {
        &self.stores
    }

    /// See [`combine_entities`](crate::merge::combine_entities).
    ///
    /// # Errors
    ///
    /// Same as the free function.
    pub fn combine_entities(
        &self,
        primary: &Entity,
        duplicate: &Entity,
        options: &MergeOptions,
    ) -> ResolveResult<CombinedEntity> {
        combine(primary, duplicate, options)?.into_result()
    }

    /// Loads a live entity under its own id. Merged-away ids are not found.
    fn load(&self, id: EntityId) -> ResolveResult<Entity> {
        match self.stores.entities.get(id)? {
            Some(entity) if entity.id() == id => Ok(entity),
            _ => Err(NotFoundError::Entity { id }.into()),
        }
    }

    /// Scores and combines two entities without committing.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Entity` if either id is unknown or merged away
    /// - `ValidationError::SelfMerge`
    /// - `ValidationError::InvalidManualResolution` for a malformed manual value
    pub fn preview_merge(
        &self,
        primary_id: EntityId,
        duplicate_id: EntityId,
        options: &MergeOptions,
    ) -> ResolveResult<MergePreview> {
        if primary_id == duplicate_id {
            return Err(ValidationError::SelfMerge { id: primary_id }.into());
        }
        let primary = self.load(primary_id)?;
        let duplicate = self.load(duplicate_id)?;

        let duplicate_score = self.detector.calculate_duplicate_probability(
            &primary,
            &duplicate,
            &DetectionOptions::default().with_same_type_only(false),
        );
        let mut issues: Vec<String> =
            duplicate_score.warnings.iter().map(ToString::to_string).collect();
        let estimated_confidence = Confidence::blend_favoring_higher(
            primary.confidence,
            duplicate.confidence,
            crate::merge::combine::CONFIDENCE_BLEND,
        );

        if primary.entity_type() != duplicate.entity_type() {
            issues.insert(
                0,
                format!(
                    "entity kinds differ: {} vs {}",
                    primary.entity_type().as_str(),
                    duplicate.entity_type().as_str()
                ),
            );
            return Ok(MergePreview {
                primary_id,
                duplicate_id,
                combined: None,
                conflicts: Vec::new(),
                duplicate_score,
                estimated_confidence,
                quality: MergeQuality::Poor,
                issues,
                blocked: true,
            });
        }

        let combination = combine(&primary, &duplicate, options)?;
        let penalty = combination.conflicts.iter().fold(0u8, |steps, c| match c.severity {
            ConflictSeverity::High => steps.saturating_add(2),
            ConflictSeverity::Medium => steps.saturating_add(1),
            ConflictSeverity::Low => steps,
        });
        let quality =
            MergeQuality::from_level(duplicate_score.confidence_level).downgrade(penalty);

        for conflict in &combination.conflicts {
            if conflict.severity > ConflictSeverity::Low {
                issues.push(conflict.to_string());
            }
        }
        for path in &combination.needs_decision {
            issues.push(format!("'{path}' needs a manual decision before merging"));
        }
        for path in &combination.unresolved {
            issues.push(format!("'{path}' has no manual resolution"));
        }
        let blocked = !combination.needs_decision.is_empty() || !combination.unresolved.is_empty();

        Ok(MergePreview {
            primary_id,
            duplicate_id,
            combined: Some(combination.entity),
            conflicts: combination.conflicts,
            duplicate_score,
            estimated_confidence,
            quality,
            issues,
            blocked,
        })
    }

    /// Merges `duplicate_id` into `primary_id` and records how to undo it.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Entity` if either entity is missing or already merged away
    /// - any error from [`combine_entities`](crate::merge::combine_entities)
    /// - `ConflictError::VersionMismatch` / `RetriesExhausted` if concurrent
    ///   writers keep winning
    /// - `StorageError` from the collaborator stores; when it comes after the
    ///   commit the merge has already been rolled back, or the message says
    ///   why it could not be
    pub fn merge_entities(
        &self,
        primary_id: EntityId,
        duplicate_id: EntityId,
        options: &MergeOptions,
    ) -> ResolveResult<MergeResult> {
        if primary_id == duplicate_id {
            return Err(ValidationError::SelfMerge { id: primary_id }.into());
        }

        let attempts = options.max_retries.saturating_add(1);
        let mut last_stale = None;
        for attempt in 1..=attempts {
            let primary = self.load(primary_id)?;
            let duplicate = self.load(duplicate_id)?;
            let combined = self.combine_entities(&primary, &duplicate, options)?;

            let commit = MergeCommit {
                merged: combined.entity,
                expected_primary_version: primary.version,
                duplicate: duplicate_id,
                expected_duplicate_version: duplicate.version,
                soft_delete: options.soft_delete,
            };
            match self.stores.entities.commit_merge(commit)? {
                CommitOutcome::Committed(merged) => {
                    let conflicts = combined.conflicts;
                    return self
                        .finish_merge(primary, duplicate, merged, conflicts, options, attempt);
                }
                CommitOutcome::Stale { id, expected, actual } => {
                    warn!(
                        target: TARGET_MERGE,
                        %primary_id,
                        %duplicate_id,
                        stale = %id,
                        expected,
                        actual,
                        attempt,
                        "merge commit rejected: entity changed concurrently"
                    );
                    last_stale = Some((id, expected, actual));
                }
            }
        }

        match last_stale {
            Some((id, expected, actual)) if attempts == 1 => {
                Err(ConflictError::VersionMismatch { id, expected, actual }.into())
            }
            _ => Err(ConflictError::RetriesExhausted {
                primary: primary_id,
                duplicate: duplicate_id,
                attempts,
            }
            .into()),
        }
    }

    fn finish_merge(
        &self,
        primary: Entity,
        duplicate: Entity,
        merged: Entity,
        conflicts: Vec<MergeConflict>,
        options: &MergeOptions,
        attempts: u32,
    ) -> ResolveResult<MergeResult> {
        let (primary_id, duplicate_id) = (primary.id(), duplicate.id());
        let mut applied = Vec::new();
        let recorded =
            self.record_merge(&primary, &duplicate, &merged, &conflicts, options, &mut applied);
        let (history_id, pointer_rewrites) = match recorded {
            Ok(recorded) => recorded,
            Err(err) => {
                return Err(self.compensate(primary, duplicate, &applied, options.soft_delete, err));
            }
        };

        info!(
            target: TARGET_MERGE,
            %primary_id,
            %duplicate_id,
            %history_id,
            version = merged.version,
            conflicts = conflicts.len(),
            pointer_rewrites,
            soft_delete = options.soft_delete,
            "merge committed"
        );

        Ok(MergeResult {
            merged,
            history_id,
            conflicts,
            pointer_rewrites,
            attempts,
        })
    }

    /// Moves pointers onto the primary and appends the history entry.
    ///
    /// Rewrites land in `applied` as they succeed so a failure part way
    /// through can be reversed.
    fn record_merge(
        &self,
        primary: &Entity,
        duplicate: &Entity,
        merged: &Entity,
        conflicts: &[MergeConflict],
        options: &MergeOptions,
        applied: &mut Vec<PointerRewrite>,
    ) -> ResolveResult<(MergeHistoryId, usize)> {
        let (primary_id, duplicate_id) = (primary.id(), duplicate.id());
        applied.extend(self.stores.relationships.repoint(duplicate_id, primary_id)?);
        applied.extend(self.stores.jobs.repoint(duplicate_id, primary_id)?);

        let history = MergeHistory {
            id: MergeHistoryId::new(),
            primary_id,
            duplicate_id,
            pre_merge_primary: primary.clone(),
            pre_merge_duplicate: duplicate.clone(),
            merged_version: merged.version,
            conflicts_resolved: conflicts.to_vec(),
            pointer_rewrites: applied.clone(),
            soft_delete: options.soft_delete,
            timestamp: Utc::now(),
            undone_at: None,
        };
        let history_id = history.id;
        self.stores.history.append(history)?;
        Ok((history_id, applied.len()))
    }

    /// Rolls a committed merge back after its pointers or history could not
    /// be recorded, returning the error to surface.
    ///
    /// A hard-deleted duplicate cannot come back; its pointers stay on the
    /// primary and the error says so.
    fn compensate(
        &self,
        primary: Entity,
        duplicate: Entity,
        applied: &[PointerRewrite],
        soft_delete: bool,
        cause: ResolveError,
    ) -> ResolveError {
        let (primary_id, duplicate_id) = (primary.id(), duplicate.id());
        error!(
            target: TARGET_MERGE,
            %primary_id,
            %duplicate_id,
            error = %cause,
            applied = applied.len(),
            "merge committed but not recorded; rolling back"
        );
        if !soft_delete {
            return StorageError::BackendError(format!(
                "merge of {duplicate_id} into {primary_id} committed with hard delete \
                 but not recorded ({cause}); undo is unavailable"
            ))
            .into();
        }

        let (relationship_rewrites, job_rewrites) = split_rewrites(applied);
        let mut failures = Vec::new();
        if let Err(err) = self.stores.jobs.revert(&job_rewrites) {
            failures.push(format!("extraction job pointers: {err}"));
        }
        if let Err(err) = self.stores.relationships.revert(&relationship_rewrites) {
            failures.push(format!("relationship pointers: {err}"));
        }
        if let Err(err) = self.stores.entities.restore(primary, duplicate) {
            failures.push(format!("entities: {err}"));
        }

        if failures.is_empty() {
            warn!(target: TARGET_MERGE, %primary_id, %duplicate_id, "unrecorded merge rolled back");
            return cause;
        }
        let failures = failures.join("; ");
        error!(
            target: TARGET_MERGE,
            %primary_id,
            %duplicate_id,
            failures = %failures,
            "rollback of unrecorded merge failed"
        );
        StorageError::BackendError(format!(
            "merge of {duplicate_id} into {primary_id} not recorded ({cause}); \
             rollback failed: {failures}"
        ))
        .into()
    }

    /// Reverses a soft-delete merge.
    ///
    /// Returns `Ok(false)` if the merge was already undone. The primary must
    /// still be at the version the merge wrote; later edits are not discarded.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::MergeHistory` for an unknown id
    /// - `NotFoundError::HardDeleted` if the duplicate was erased
    /// - `ConflictError::VersionMismatch` if the primary changed after the merge
    /// - `StorageError` if a pointer or entity could not be restored; every such
    ///   failure is logged and returned
    pub fn undo_merge(&self, history_id: MergeHistoryId) -> ResolveResult<bool> {
        let history = self
            .stores
            .history
            .get(history_id)?
            .ok_or(NotFoundError::MergeHistory { id: history_id })?;
        if !history.soft_delete {
            return Err(NotFoundError::HardDeleted { id: history_id }.into());
        }
        if history.is_undone() {
            return Ok(false);
        }

        let current = self.load(history.primary_id)?;
        if current.version != history.merged_version {
            return Err(ConflictError::VersionMismatch {
                id: history.primary_id,
                expected: history.merged_version,
                actual: current.version,
            }
            .into());
        }

        let (relationship_rewrites, job_rewrites) = split_rewrites(&history.pointer_rewrites);

        self.stores
            .relationships
            .revert(&relationship_rewrites)
            .inspect_err(|err| {
                error!(
                    target: TARGET_MERGE,
                    %history_id,
                    error = %err,
                    "failed to revert relationship pointers"
                );
            })?;
        if let Err(err) = self.stores.jobs.revert(&job_rewrites) {
            error!(
                target: TARGET_MERGE,
                %history_id,
                error = %err,
                "failed to revert extraction job pointers"
            );
            self.reapply(&relationship_rewrites, history_id);
            return Err(err.into());
        }

        self.stores
            .entities
            .restore(history.pre_merge_primary.clone(), history.pre_merge_duplicate.clone())
            .inspect_err(|err| {
                error!(
                    target: TARGET_MERGE,
                    %history_id,
                    error = %err,
                    "failed to restore merged entities"
                );
            })?;
        self.stores.history.mark_undone(history_id).inspect_err(|err| {
            error!(
                target: TARGET_MERGE,
                %history_id,
                error = %err,
                "entities restored but history not marked undone"
            );
        })?;

        info!(
            target: TARGET_MERGE,
            %history_id,
            primary_id = %history.primary_id,
            duplicate_id = %history.duplicate_id,
            pointers = history.pointer_rewrites.len(),
            "merge undone"
        );
        Ok(true)
    }

    /// Puts reverted relationship pointers back after a later undo step failed.
    fn reapply(&self, reverted: &[PointerRewrite], history_id: MergeHistoryId) {
        let forward: Vec<PointerRewrite> = reverted
            .iter()
            .map(|r| PointerRewrite {
                target: r.target.clone(),
                from: r.to,
                to: r.from,
            })
            .collect();
        if let Err(err) = self.stores.relationships.revert(&forward) {
            error!(
                target: TARGET_MERGE,
                %history_id,
                error = %err,
                "could not reapply relationship pointers; graph needs manual repair"
            );
        }
    }

    /// Merge history entries naming `id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the history store.
    pub fn history_for(&self, id: EntityId) -> ResolveResult<Vec<MergeHistory>> {
        Ok(self.stores.history.find_by_entity(id)?)
    }
}

/// Relationship rewrites first, extraction job rewrites second.
fn split_rewrites(rewrites: &[PointerRewrite]) -> (Vec<PointerRewrite>, Vec<PointerRewrite>) {
    rewrites
        .iter()
        .cloned()
        .partition(|r| matches!(r.target, PointerTarget::Relationship { .. }))
}
