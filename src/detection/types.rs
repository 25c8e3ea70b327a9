//! Duplicate scores, pairs and clusters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, EntityId};

/// How sure the detector is that a pair is one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// `very_high ≥ 0.90`, `high ≥ 0.80`, `medium ≥ 0.70`, else `low`.
    #[must_use]
    pub fn from_score(overall: f64) -> Self {
        if overall >= 0.90 {
            Self::VeryHigh
        } else if overall >= 0.80 {
            Self::High
        } else if overall >= 0.70 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn recommendation(self) -> Recommendation {
        match self {
            Self::VeryHigh => Recommendation::AutoMerge,
            Self::High => Recommendation::Review,
            Self::Medium => Recommendation::ManualDecision,
            Self::Low => Recommendation::ProbablyDifferent,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(s)
    }
}

/// What to do with a scored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AutoMerge,
    Review,
    ManualDecision,
    ProbablyDifferent,
}

/// The five detector signals, or their weighted contributions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub name: f64,
    pub date: f64,
    pub location: f64,
    pub relationship: f64,
    pub attribute: f64,
}

impl SignalScores {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.name + self.date + self.location + self.relationship + self.attribute
    }

    #[must_use]
    pub(crate) fn scaled(self, factor: f64) -> Self {
        Self {
            name: self.name * factor,
            date: self.date * factor,
            location: self.location * factor,
            relationship: self.relationship * factor,
            attribute: self.attribute * factor,
        }
    }
}

/// Caveats attached to a pair score for reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateWarning {
    /// Same name, far-apart dates: a later incarnation or a lineage holder.
    PossibleReincarnation,
    /// Same name, different places.
    PossibleHomonym,
    /// A person without comparable dates.
    MissingDates,
    MissingLocations,
    /// Near-identical names, but neither record has been verified.
    UnverifiedNearExactNames,
}

impl fmt::Display for DuplicateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PossibleReincarnation => {
                "names match but dates conflict: possible reincarnation or lineage successor"
            }
            Self::PossibleHomonym => "names match but locations differ: possible homonym",
            Self::MissingDates => "no comparable dates",
            Self::MissingLocations => "no comparable locations",
            Self::UnverifiedNearExactNames => "near-identical names on two unverified records",
        };
        f.write_str(s)
    }
}

/// Multi-signal duplicate probability for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateScore {
    pub overall: f64,
    pub confidence_level: ConfidenceLevel,
    pub signals: SignalScores,
    /// Each signal's share of `overall`; they sum to `overall`.
    pub weights: SignalScores,
    pub warnings: Vec<DuplicateWarning>,
}

/// A scored candidate match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub score: DuplicateScore,
    pub recommendation: Recommendation,
    pub detected_at: DateTime<Utc>,
}

impl DuplicatePair {
    #[must_use]
    pub const fn level(&self) -> ConfidenceLevel {
        self.score.confidence_level
    }

    /// The other end of the pair, if `id` is one end.
    #[must_use]
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.entity1 == id {
            Some(self.entity2)
        } else if self.entity2 == id {
            Some(self.entity1)
        } else {
            None
        }
    }
}

/// Stable cluster identifier, derived from the member ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(Uuid);

impl ClusterId {
    /// Hash of the sorted member ids, so the same members always get the same id.
    #[must_use]
    pub fn from_members(members: &[EntityId]) -> Self {
        let mut sorted = members.to_vec();
        sorted.sort();
        let mut hasher = blake3::Hasher::new();
        for id in &sorted {
            hasher.update(id.as_uuid().as_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One edge of a cluster, kept for audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterEdge {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub similarity: f64,
}

/// A connected component of duplicate pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCluster {
    pub id: ClusterId,
    /// At least two pairwise-distinct entities.
    pub entities: Vec<Entity>,
    pub avg_similarity: f64,
    pub connections: Vec<ClusterEdge>,
    /// Member with the highest standalone confidence.
    pub suggested_canonical: EntityId,
}

impl EntityCluster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|e| e.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Two members with a very-high pair: merge into the suggested canonical.
    SingleCanonical,
    ManualReview,
    NoMerge,
}

/// A cluster plus its pairs and a merge plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub cluster: EntityCluster,
    pub pairs: Vec<DuplicatePair>,
    pub merge_strategy: MergeStrategy,
}
