//! # Lotsawa - entity resolution for historical corpora
//!
//! Lotsawa consolidates entity records extracted independently from many
//! historical sources (people, places, texts, events, institutions, deities,
//! lineages, artifacts) into one canonical record per real-world entity.
//!
//! ## Pipeline
//!
//! - **Temporal**: [`TemporalResolver`] turns Gregorian, Tibetan-calendar,
//!   relative, era and century expressions into a [`DateInfo`]
//! - **Fuzzy**: [`FuzzyMatcher`] scores names across scripts and spellings
//! - **Detection**: [`DuplicateDetector`] fuses name, date, location and
//!   attribute signals per pair; [`Clusterer`] groups the pairs
//! - **Merge**: [`EntityMerger`] combines records, commits optimistically and
//!   can undo a merge from its history entry
//!
//! ## Usage
//!
//! ```rust
//! use lotsawa::config::DetectionOptions;
//! use lotsawa::{DateInfo, DuplicateDetector, Entity, EntityKind, Recommendation};
//!
//! let a = Entity::new("Marpa Lotsawa", EntityKind::person())
//!     .with_date("birth", DateInfo::circa(1012));
//! let b = Entity::new("Mar-pa", EntityKind::person()).with_date("birth", DateInfo::circa(1015));
//!
//! let detector = DuplicateDetector::default();
//! let pairs = detector.find_duplicates(&a, &[b], &DetectionOptions::default());
//! assert_eq!(pairs[0].recommendation, Recommendation::Review);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod confidence;
pub mod config;
pub mod detection;
pub mod entity;
pub mod error;
pub mod extraction;
pub mod fuzzy;
pub mod merge;
pub mod storage;
pub mod temporal;

/// Log target for name matching.
pub const TARGET_MATCH: &str = "lotsawa::match";
/// Log target for duplicate detection and scans.
pub const TARGET_DETECT: &str = "lotsawa::detect";
/// Log target for merges and undo.
pub const TARGET_MERGE: &str = "lotsawa::merge";
/// Log target for date resolution.
pub const TARGET_TEMPORAL: &str = "lotsawa::temporal";
/// Log target for candidate extraction.
pub const TARGET_EXTRACT: &str = "lotsawa::extract";

pub use confidence::Confidence;
pub use config::{ConflictStrategy, DetectionOptions, MergeOptions, ResolverConfig, ScanConfig};
pub use detection::{
    CancellationToken, Clusterer, ConfidenceLevel, DuplicateDetector, DuplicateGroup,
    DuplicatePair, DuplicateScore, EntityCluster, MergeStrategy, Recommendation, ScanReport,
};
pub use entity::{Entity, EntityId, EntityKind, EntityType, Relationship, Script};
pub use error::{
    ConflictError, InvalidDateError, NotFoundError, RangeError, ResolveError, ResolveResult,
    StorageError, ValidationError,
};
pub use extraction::{CandidateExtractor, FallbackExtractor, PatternExtractor, RawEntityMention};
pub use fuzzy::{FuzzyMatcher, MatchType, NameVerdict, SimilarityScore};
pub use merge::{
    combine_entities, EntityMerger, MergeHistory, MergeHistoryId, MergePreview, MergeResult,
};
pub use storage::Stores;
pub use temporal::{DateContext, DateInfo, DatePrecision, TemporalResolver};
