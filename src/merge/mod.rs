//! Entity merging with conflict resolution and rollback.

pub mod combine;
pub mod conflict;
pub mod history;
pub mod merger;

pub use combine::{combine_entities, CombinedEntity};
pub use conflict::{ConflictSeverity, MergeConflict, ResolvedBy};
pub use history::{MergeHistory, MergeHistoryId};
pub use merger::{EntityMerger, MergePreview, MergeQuality, MergeResult};
