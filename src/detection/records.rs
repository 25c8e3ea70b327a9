//! Exact-decimal storage records.
//!
//! Some graph stores keep scores as decimals rather than floats. These records
//! carry every score as a fixed four-place string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::types::{
    ClusterId, ConfidenceLevel, DuplicatePair, EntityCluster, MergeStrategy, Recommendation,
    SignalScores,
};
use crate::entity::EntityId;

fn decimal(value: f64) -> String {
    format!("{value:.4}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub name: String,
    pub date: String,
    pub location: String,
    pub relationship: String,
    pub attribute: String,
}

impl From<&SignalScores> for SignalRecord {
    fn from(s: &SignalScores) -> Self {
        Self {
            name: decimal(s.name),
            date: decimal(s.date),
            location: decimal(s.location),
            relationship: decimal(s.relationship),
            attribute: decimal(s.attribute),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePairRecord {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub overall: String,
    pub confidence_level: ConfidenceLevel,
    pub recommendation: Recommendation,
    pub signals: SignalRecord,
    pub weights: SignalRecord,
    pub warnings: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl From<&DuplicatePair> for DuplicatePairRecord {
    fn from(pair: &DuplicatePair) -> Self {
        Self {
            entity1: pair.entity1,
            entity2: pair.entity2,
            overall: decimal(pair.score.overall),
            confidence_level: pair.score.confidence_level,
            recommendation: pair.recommendation,
            signals: SignalRecord::from(&pair.score.signals),
            weights: SignalRecord::from(&pair.score.weights),
            warnings: pair.score.warnings.iter().map(ToString::to_string).collect(),
            detected_at: pair.detected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub similarity: String,
}

/// A cluster with member ids instead of full entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: ClusterId,
    pub entity_ids: Vec<EntityId>,
    pub avg_similarity: String,
    pub connections: Vec<ConnectionRecord>,
    pub suggested_canonical: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,
}

impl From<&EntityCluster> for ClusterRecord {
    fn from(cluster: &EntityCluster) -> Self {
        Self {
            id: cluster.id,
            entity_ids: cluster.entities.iter().map(|e| e.id()).collect(),
            avg_similarity: decimal(cluster.avg_similarity),
            connections: cluster
                .connections
                .iter()
                .map(|c| ConnectionRecord {
                    entity1: c.entity1,
                    entity2: c.entity2,
                    similarity: decimal(c.similarity),
                })
                .collect(),
            suggested_canonical: cluster.suggested_canonical,
            merge_strategy: None,
        }
    }
}

impl ClusterRecord {
    #[must_use]
    pub const fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = Some(strategy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionOptions;
    use crate::detection::DuplicateDetector;
    use crate::entity::{Entity, EntityKind};
    use crate::temporal::DateInfo;

    #[test]
    fn test_scores_render_as_four_place_decimals() {
        let entities = vec![
            Entity::new("Marpa Lotsawa", EntityKind::person())
                .with_date("birth", DateInfo::circa(1012)),
            Entity::new("Mar-pa", EntityKind::person()).with_date("birth", DateInfo::circa(1015)),
        ];
        let groups = DuplicateDetector::default()
            .detect_all_duplicates(&entities, &DetectionOptions::default());
        let group = &groups[0];

        let pair = DuplicatePairRecord::from(&group.pairs[0]);
        assert_eq!(pair.overall, "0.8647");
        assert_eq!(pair.signals.name, "0.9800");
        assert_eq!(pair.signals.date, "0.8500");
        assert_eq!(pair.signals.relationship, "0.5000");

        let cluster = ClusterRecord::from(&group.cluster).with_strategy(group.merge_strategy);
        assert_eq!(cluster.entity_ids.len(), 2);
        assert_eq!(cluster.avg_similarity, "0.8647");
        assert_eq!(cluster.merge_strategy, Some(MergeStrategy::ManualReview));

        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["overall"], serde_json::json!("0.8647"));
    }
}
