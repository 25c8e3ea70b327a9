//! Multi-signal duplicate detection.

use std::cmp::Ordering;

use chrono::Utc;
use tracing::debug;

use crate::config::{DetectionOptions, ScanConfig};
use crate::detection::cluster::Clusterer;
use crate::detection::scan::CancellationToken;
use crate::detection::signals::{
    attribute_similarity, date_similarity, location_similarity, relationship_similarity, NEUTRAL,
};
use crate::detection::types::{
    ConfidenceLevel, DuplicateGroup, DuplicatePair, DuplicateScore, DuplicateWarning,
    EntityCluster, MergeStrategy, SignalScores,
};
use crate::entity::{Entity, EntityType};
use crate::fuzzy::FuzzyMatcher;
use crate::TARGET_DETECT;

/// Nominal signal weights.
pub const BASE_WEIGHTS: SignalScores = SignalScores {
    name: 0.50,
    date: 0.20,
    location: 0.15,
    relationship: 0.10,
    attribute: 0.05,
};

/// Floor applied to near-exact names with no date or location conflict.
pub const NEAR_EXACT_FLOOR: f64 = 0.92;

const NEAR_EXACT_NAME: f64 = 0.98;
const CONFLICT_BELOW: f64 = 0.3;
const STRONG_NAME: f64 = 0.85;

/// A non-name signal sitting exactly on the neutral value counts half.
#[allow(clippy::float_cmp)]
fn effective_weight(signal: f64, weight: f64) -> f64 {
    if signal == NEUTRAL {
        weight * 0.5
    } else {
        weight
    }
}

#[allow(clippy::float_cmp)]
fn warnings_for(signals: &SignalScores, e1: &Entity, e2: &Entity) -> Vec<DuplicateWarning> {
    let mut warnings = Vec::new();
    if signals.name > STRONG_NAME && signals.date < CONFLICT_BELOW {
        warnings.push(DuplicateWarning::PossibleReincarnation);
    }
    if signals.name > STRONG_NAME
        && signals.location < CONFLICT_BELOW
        && signals.location != NEUTRAL
    {
        warnings.push(DuplicateWarning::PossibleHomonym);
    }
    let any_person =
        e1.entity_type() == EntityType::Person || e2.entity_type() == EntityType::Person;
    if signals.date == NEUTRAL && any_person {
        warnings.push(DuplicateWarning::MissingDates);
    }
    if signals.location == NEUTRAL {
        warnings.push(DuplicateWarning::MissingLocations);
    }
    if signals.name > 0.95 && !e1.verified && !e2.verified {
        warnings.push(DuplicateWarning::UnverifiedNearExactNames);
    }
    warnings
}

/// Fuses five signals into a [`DuplicateScore`].
#[must_use]
pub fn fuse_signals(signals: SignalScores, e1: &Entity, e2: &Entity) -> DuplicateScore {
    let effective = SignalScores {
        name: BASE_WEIGHTS.name,
        date: effective_weight(signals.date, BASE_WEIGHTS.date),
        location: effective_weight(signals.location, BASE_WEIGHTS.location),
        relationship: effective_weight(signals.relationship, BASE_WEIGHTS.relationship),
        attribute: effective_weight(signals.attribute, BASE_WEIGHTS.attribute),
    };
    let total = effective.sum();

    let mut contributions = SignalScores {
        name: signals.name * effective.name / total,
        date: signals.date * effective.date / total,
        location: signals.location * effective.location / total,
        relationship: signals.relationship * effective.relationship / total,
        attribute: signals.attribute * effective.attribute / total,
    };
    let mut overall = contributions.sum();

    let no_conflict = signals.date >= CONFLICT_BELOW && signals.location >= CONFLICT_BELOW;
    if signals.name > NEAR_EXACT_NAME && no_conflict && overall < NEAR_EXACT_FLOOR {
        if overall > 0.0 {
            contributions = contributions.scaled(NEAR_EXACT_FLOOR / overall);
        } else {
            contributions.name = NEAR_EXACT_FLOOR;
        }
        overall = NEAR_EXACT_FLOOR;
    }
    let overall = overall.clamp(0.0, 1.0);

    DuplicateScore {
        overall,
        confidence_level: ConfidenceLevel::from_score(overall),
        signals,
        weights: contributions,
        warnings: warnings_for(&signals, e1, e2),
    }
}

/// Sort by overall score, highest first.
pub(crate) fn by_overall_desc(a: &DuplicatePair, b: &DuplicatePair) -> Ordering {
    b.score
        .overall
        .partial_cmp(&a.score.overall)
        .unwrap_or(Ordering::Equal)
}

/// Pairwise duplicate detector.
///
/// Holds no mutable state; one instance can be shared across scan workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDetector {
    matcher: FuzzyMatcher,
}

impl DuplicateDetector {
    #[must_use]
    pub const fn new(matcher: FuzzyMatcher) -> Self {
        Self { matcher }
    }

    #[must_use]
    pub const fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Scores one pair on all five signals.
    #[must_use]
    pub fn calculate_duplicate_probability(
        &self,
        e1: &Entity,
        e2: &Entity,
        options: &DetectionOptions,
    ) -> DuplicateScore {
        let name = self.matcher.compare_entities(e1, e2).score;
        self.score_with_name(name, e1, e2, options)
    }

    fn score_with_name(
        &self,
        name: f64,
        e1: &Entity,
        e2: &Entity,
        options: &DetectionOptions,
    ) -> DuplicateScore {
        let signals = SignalScores {
            name,
            date: date_similarity(e1, e2, options.strict_date_matching),
            location: location_similarity(e1, e2),
            relationship: relationship_similarity(e1, e2),
            attribute: attribute_similarity(e1, e2),
        };
        fuse_signals(signals, e1, e2)
    }

    /// Scores a candidate against the option filters; `None` if any filter
    /// rejects it.
    pub(crate) fn score_candidate(
        &self,
        entity: &Entity,
        candidate: &Entity,
        options: &DetectionOptions,
    ) -> Option<DuplicatePair> {
        if entity.id() == candidate.id() {
            return None;
        }
        if options.same_type_only && entity.entity_type() != candidate.entity_type() {
            return None;
        }
        let name = self.matcher.compare_entities(entity, candidate).score;
        if name < options.min_name_similarity {
            return None;
        }
        let score = self.score_with_name(name, entity, candidate, options);
        if score.overall < options.threshold {
            return None;
        }
        debug!(
            target: TARGET_DETECT,
            entity1 = %entity.id(),
            entity2 = %candidate.id(),
            overall = score.overall,
            level = %score.confidence_level,
            "duplicate candidate"
        );
        Some(DuplicatePair {
            entity1: entity.id(),
            entity2: candidate.id(),
            recommendation: score.confidence_level.recommendation(),
            score,
            detected_at: Utc::now(),
        })
    }

    /// Candidates in `pool` that look like duplicates of `entity`, best first.
    #[must_use]
    pub fn find_duplicates(
        &self,
        entity: &Entity,
        pool: &[Entity],
        options: &DetectionOptions,
    ) -> Vec<DuplicatePair> {
        let mut pairs: Vec<DuplicatePair> = pool
            .iter()
            .filter_map(|candidate| self.score_candidate(entity, candidate, options))
            .collect();
        pairs.sort_by(by_overall_desc);
        if let Some(limit) = options.limit {
            pairs.truncate(limit);
        }
        pairs
    }

    /// Full pairwise scan over `entities`, clustered into groups.
    ///
    /// Runs on the default worker pool with no cancellation.
    #[must_use]
    pub fn detect_all_duplicates(
        &self,
        entities: &[Entity],
        options: &DetectionOptions,
    ) -> Vec<DuplicateGroup> {
        self.detect_all_duplicates_with_cancel(
            entities,
            options,
            &ScanConfig::default(),
            &CancellationToken::new(),
        )
        .groups
    }
}

/// Merge plan for a cluster, from its strongest pair.
#[must_use]
pub fn merge_strategy_for(cluster: &EntityCluster, pairs: &[DuplicatePair]) -> MergeStrategy {
    let best = pairs.iter().map(DuplicatePair::level).max();
    match best {
        Some(ConfidenceLevel::VeryHigh) if cluster.len() == 2 => MergeStrategy::SingleCanonical,
        Some(ConfidenceLevel::VeryHigh | ConfidenceLevel::High) => MergeStrategy::ManualReview,
        _ => MergeStrategy::NoMerge,
    }
}

/// Clusters `pairs` and attaches each cluster's own pairs and merge plan.
#[must_use]
pub fn group_duplicates(entities: &[Entity], pairs: &[DuplicatePair]) -> Vec<DuplicateGroup> {
    Clusterer::new()
        .cluster_similar_entities(entities, pairs)
        .into_iter()
        .map(|cluster| {
            let own: Vec<DuplicatePair> = pairs
                .iter()
                .filter(|p| cluster.contains(p.entity1) && cluster.contains(p.entity2))
                .cloned()
                .collect();
            let merge_strategy = merge_strategy_for(&cluster, &own);
            DuplicateGroup {
                cluster,
                pairs: own,
                merge_strategy,
            }
        })
        .collect()
}
