//! Duplicate detection and clustering.
//!
//! [`DuplicateDetector`] fuses a name score from the fuzzy matcher with date,
//! location, relationship and attribute signals. [`Clusterer`] turns the
//! surviving pairs into connected components.

pub mod cluster;
pub mod detector;
pub mod records;
pub mod scan;
pub mod signals;
pub mod types;

pub use cluster::Clusterer;
pub use detector::{
    fuse_signals, group_duplicates, DuplicateDetector, BASE_WEIGHTS, NEAR_EXACT_FLOOR,
};
pub use records::{ClusterRecord, DuplicatePairRecord};
pub use scan::{CancellationToken, ScanReport};
pub use types::{
    ClusterEdge, ClusterId, ConfidenceLevel, DuplicateGroup, DuplicatePair, DuplicateScore,
    DuplicateWarning, EntityCluster, MergeStrategy, Recommendation, SignalScores,
};
