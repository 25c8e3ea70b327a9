//! Collaborator storage: trait contracts and in-memory backends.

pub mod memory;
mod traits;

use std::sync::Arc;

pub use memory::{
    InMemoryEntityStore, InMemoryExtractionJobStore, InMemoryMergeHistoryStore,
    InMemoryRelationshipStore,
};
pub use traits::{
    CommitOutcome, EntityStore, ExtractionJobStore, MergeCommit, MergeHistoryStore,
    PointerRewrite, PointerTarget, RelationshipStore,
};

/// The stores a merger reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub entities: Arc<dyn EntityStore>,
    pub relationships: Arc<dyn RelationshipStore>,
    pub jobs: Arc<dyn ExtractionJobStore>,
    pub history: Arc<dyn MergeHistoryStore>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entities: Arc::new(InMemoryEntityStore::new()),
            relationships: Arc::new(InMemoryRelationshipStore::new()),
            jobs: Arc::new(InMemoryExtractionJobStore::new()),
            history: Arc::new(InMemoryMergeHistoryStore::new()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
