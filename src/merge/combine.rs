//! Pure entity combination.
//!
//! Typed attributes are merged through their JSON form: arrays are unioned
//! primary-first, a value present on one side only is kept, and two differing
//! scalars become a [`MergeConflict`] settled by the configured strategy or a
//! manual resolution.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{ConflictStrategy, MergeOptions};
use crate::confidence::Confidence;
use crate::entity::{Entity, EntityKind, Provenance, Script};
use crate::error::{ConflictError, ResolveResult, ValidationError};
use crate::merge::conflict::{ConflictSeverity, MergeConflict, ResolvedBy};
use crate::temporal::DateInfo;

/// Weight given to the more confident source when blending confidences.
pub const CONFIDENCE_BLEND: f64 = 0.7;

/// Output of [`combine_entities`].
#[derive(Debug, Clone)]
pub struct CombinedEntity {
    /// Carries the primary's id and version.
    pub entity: Entity,
    pub conflicts: Vec<MergeConflict>,
}

/// A combination that may still have open conflicts.
#[derive(Debug, Clone)]
pub(crate) struct Combination {
    pub entity: Entity,
    pub conflicts: Vec<MergeConflict>,
    /// High-severity paths without a manual resolution.
    pub needs_decision: Vec<String>,
    /// Paths left open under the manual strategy.
    pub unresolved: Vec<String>,
}

impl Combination {
    pub(crate) fn into_result(self) -> ResolveResult<CombinedEntity> {
        if !self.needs_decision.is_empty() {
            return Err(ConflictError::ManualDecisionRequired {
                count: self.needs_decision.len(),
                paths: self.needs_decision,
            }
            .into());
        }
        if let Some(path) = self.unresolved.into_iter().next() {
            return Err(ConflictError::UnresolvedConflict { path }.into());
        }
        Ok(CombinedEntity {
            entity: self.entity,
            conflicts: self.conflicts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Primary,
    Duplicate,
}

fn invalid(path: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidManualResolution {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn to_json<T: Serialize>(path: &str, value: &T) -> ResolveResult<Value> {
    serde_json::to_value(value).map_err(|e| invalid(path, e.to_string()).into())
}

struct Combiner<'a> {
    options: &'a MergeOptions,
    preferred: Option<(Side, ResolvedBy)>,
    conflicts: Vec<MergeConflict>,
    needs_decision: Vec<String>,
    unresolved: Vec<String>,
}

impl<'a> Combiner<'a> {
    fn new(primary: &Entity, duplicate: &Entity, options: &'a MergeOptions) -> Self {
        let preferred = match options.conflict_strategy {
            ConflictStrategy::HighestConfidence => {
                let side = if duplicate.confidence.value() > primary.confidence.value() {
                    Side::Duplicate
                } else {
                    Side::Primary
                };
                Some((side, ResolvedBy::HighestConfidence))
            }
            ConflictStrategy::Newest => {
                let side = if duplicate.provenance.updated_at > primary.provenance.updated_at {
                    Side::Duplicate
                } else {
                    Side::Primary
                };
                Some((side, ResolvedBy::Newest))
            }
            ConflictStrategy::Manual => None,
        };
        Self {
            options,
            preferred,
            conflicts: Vec::new(),
            needs_decision: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Settles a scalar conflict. Open conflicts keep the primary's value.
    fn settle(
        &mut self,
        path: String,
        primary: Value,
        duplicate: Value,
        severity: ConflictSeverity,
    ) -> Value {
        let conflict =
            MergeConflict::new(path.clone(), primary.clone(), duplicate.clone(), severity);
        if let Some(value) = self.options.manual_resolutions.get(&path) {
            self.conflicts.push(conflict.resolved(value.clone(), ResolvedBy::Manual));
            return value.clone();
        }
        match self.preferred {
            Some((side, by)) => {
                let value = match side {
                    Side::Primary => primary,
                    Side::Duplicate => duplicate,
                };
                self.conflicts.push(conflict.resolved(value.clone(), by));
                value
            }
            None => {
                self.unresolved.push(path);
                self.conflicts.push(conflict);
                primary
            }
        }
    }

    fn canonical_name(&mut self, primary: &Entity, duplicate: &Entity) -> ResolveResult<String> {
        if primary.canonical_name == duplicate.canonical_name {
            return Ok(primary.canonical_name.clone());
        }
        let chosen = self.settle(
            "canonical_name".to_string(),
            Value::String(primary.canonical_name.clone()),
            Value::String(duplicate.canonical_name.clone()),
            ConflictSeverity::Low,
        );
        match chosen {
            Value::String(name) if !name.trim().is_empty() => Ok(name),
            other => {
                let reason = format!("expected a non-empty string, got {other}");
                Err(invalid("canonical_name", reason).into())
            }
        }
    }

    fn attributes(
        &mut self,
        primary: Map<String, Value>,
        mut duplicate: Map<String, Value>,
    ) -> Map<String, Value> {
        let mut merged = Map::new();
        let mut pairs: Vec<(String, Value, Value)> = primary
            .into_iter()
            .map(|(key, pv)| {
                let dv = duplicate.remove(&key).unwrap_or(Value::Null);
                (key, pv, dv)
            })
            .collect();
        pairs.extend(duplicate.into_iter().map(|(key, dv)| (key, Value::Null, dv)));

        for (key, pv, dv) in pairs {
            let value = match (pv, dv) {
                (Value::Array(a), Value::Array(b)) => Value::Array(union_values(a, b)),
                (Value::Null, v) | (v, Value::Null) => v,
                (a, b) if a == b => a,
                (a, b) => self.settle(format!("attributes.{key}"), a, b, ConflictSeverity::Medium),
            };
            if !value.is_null() {
                merged.insert(key, value);
            }
        }
        merged
    }

    fn date(
        &mut self,
        label: &str,
        primary: &DateInfo,
        duplicate: &DateInfo,
    ) -> ResolveResult<DateInfo> {
        let preferred = if more_reliable(duplicate, primary) { duplicate } else { primary };
        let conflicting = match (primary.effective_year(), duplicate.effective_year()) {
            (Some(a), Some(b)) => {
                a != b
                    && primary.precision.is_at_least_circa()
                    && duplicate.precision.is_at_least_circa()
            }
            _ => false,
        };
        if !conflicting {
            return Ok(preferred.clone());
        }

        let path = format!("dates.{label}");
        let severity = if matches!(label, "birth" | "death") {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };
        let conflict = MergeConflict::new(
            path.clone(),
            to_json(&path, primary)?,
            to_json(&path, duplicate)?,
            severity,
        );

        if let Some(value) = self.options.manual_resolutions.get(&path) {
            let date = manual_date(&path, value)?;
            self.conflicts.push(conflict.resolved(to_json(&path, &date)?, ResolvedBy::Manual));
            return Ok(date);
        }
        if severity == ConflictSeverity::High {
            self.needs_decision.push(path);
            self.conflicts.push(conflict);
        } else if self.preferred.is_none() {
            self.unresolved.push(path);
            self.conflicts.push(conflict);
        } else {
            let value = to_json(&path, preferred)?;
            self.conflicts.push(conflict.resolved(value, ResolvedBy::Precision));
        }
        Ok(preferred.clone())
    }
}

/// True if `a` should win over `b`: higher precision rank, then higher confidence.
fn more_reliable(a: &DateInfo, b: &DateInfo) -> bool {
    match a.precision.rank().cmp(&b.precision.rank()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a.confidence.value() > b.confidence.value(),
    }
}

/// A manual date is either a bare year or a full `DateInfo` object.
fn manual_date(path: &str, value: &Value) -> ResolveResult<DateInfo> {
    if let Some(year) = value.as_i64() {
        let year = i32::try_from(year)
            .map_err(|_| invalid(path, format!("year {year} out of range")))?;
        return Ok(DateInfo::exact(year).with_source("manual resolution"));
    }
    let date: DateInfo =
        serde_json::from_value(value.clone()).map_err(|e| invalid(path, e.to_string()))?;
    if !date.is_valid() {
        return Err(invalid(path, "tibetan year outside rabjung 1-17 / year 1-60").into());
    }
    Ok(date)
}

/// Exact-value union, first-seen order.
fn union_values(mut a: Vec<Value>, b: Vec<Value>) -> Vec<Value> {
    for v in b {
        if !a.contains(&v) {
            a.push(v);
        }
    }
    a
}

/// Splits a kind into its serialized form and its attribute object.
fn split_kind(kind: &EntityKind) -> ResolveResult<(Map<String, Value>, Map<String, Value>)> {
    let Value::Object(mut outer) = to_json("attributes", kind)? else {
        return Err(invalid("attributes", "entity kind did not serialize to an object").into());
    };
    let attributes = match outer.remove("attributes") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    Ok((outer, attributes))
}

fn merge_provenance(primary: &Provenance, duplicate: &Provenance) -> Provenance {
    let mut additional = primary.additional_sources.clone();
    for source in duplicate.sources() {
        let is_primary_source = primary.source_document.as_deref() == Some(source);
        if !is_primary_source && !additional.iter().any(|s| s == source) {
            additional.push(source.to_string());
        }
    }
    Provenance {
        source_document: primary
            .source_document
            .clone()
            .or_else(|| duplicate.source_document.clone()),
        extractor: primary.extractor.clone().or_else(|| duplicate.extractor.clone()),
        created_at: primary.created_at.min(duplicate.created_at),
        updated_at: chrono::Utc::now(),
        additional_sources: additional,
    }
}

pub(crate) fn combine(
    primary: &Entity,
    duplicate: &Entity,
    options: &MergeOptions,
) -> ResolveResult<Combination> {
    if primary.id() == duplicate.id() {
        return Err(ValidationError::SelfMerge { id: primary.id() }.into());
    }
    if primary.entity_type() != duplicate.entity_type() {
        return Err(ValidationError::EntityKindMismatch {
            primary: primary.entity_type().as_str().to_string(),
            duplicate: duplicate.entity_type().as_str().to_string(),
        }
        .into());
    }

    let mut combiner = Combiner::new(primary, duplicate, options);

    let canonical_name = combiner.canonical_name(primary, duplicate)?;
    let mut name_variants = primary.name_variants.union(&duplicate.name_variants);
    for name in [&primary.canonical_name, &duplicate.canonical_name] {
        if *name != canonical_name {
            name_variants.add(Script::English, name.clone());
        }
    }

    let (mut kind_value, primary_attrs) = split_kind(&primary.kind)?;
    let (_, duplicate_attrs) = split_kind(&duplicate.kind)?;
    let attributes = combiner.attributes(primary_attrs, duplicate_attrs);
    kind_value.insert("attributes".to_string(), Value::Object(attributes));
    let kind: EntityKind = serde_json::from_value(Value::Object(kind_value))
        .map_err(|e| invalid("attributes", e.to_string()))?;

    let mut dates = primary.dates.clone();
    for (label, dup_date) in &duplicate.dates {
        let merged = match primary.dates.get(label) {
            Some(prim_date) => combiner.date(label, prim_date, dup_date)?,
            None => dup_date.clone(),
        };
        dates.insert(label.clone(), merged);
    }

    let mut entity = primary.clone();
    entity.canonical_name = canonical_name;
    entity.name_variants = name_variants;
    entity.kind = kind;
    entity.dates = dates;
    entity.confidence = Confidence::blend_favoring_higher(
        primary.confidence,
        duplicate.confidence,
        CONFIDENCE_BLEND,
    );
    entity.verified = primary.verified || duplicate.verified;
    entity.provenance = merge_provenance(&primary.provenance, &duplicate.provenance);

    Ok(Combination {
        entity,
        conflicts: combiner.conflicts,
        needs_decision: combiner.needs_decision,
        unresolved: combiner.unresolved,
    })
}

/// Combines `duplicate` into `primary` without touching any store.
///
/// # Errors
///
/// - `ValidationError::SelfMerge` or `EntityKindMismatch`
/// - `ValidationError::InvalidManualResolution` if a manual value does not fit its path
/// - `ConflictError::ManualDecisionRequired` for birth/death year conflicts without a
///   manual resolution
/// - `ConflictError::UnresolvedConflict` under the manual strategy when a conflict has
///   no resolution
///
/// # Examples
///
/// ```
/// use lotsawa::config::MergeOptions;
/// use lotsawa::merge::combine_entities;
/// use lotsawa::{Entity, EntityKind, Script};
///
/// let a = Entity::new("Marpa", EntityKind::person()).with_variant(Script::English, "Marpa");
/// let b = Entity::new("Marpa", EntityKind::person())
///     .with_variant(Script::English, "Marpa")
///     .with_variant(Script::English, "Marpa the Translator");
/// let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
/// assert_eq!(
///     combined.entity.name_variants.get(&Script::English),
///     ["Marpa", "Marpa the Translator"]
/// );
/// ```
pub fn combine_entities(
    primary: &Entity,
    duplicate: &Entity,
    options: &MergeOptions,
) -> ResolveResult<CombinedEntity> {
    combine(primary, duplicate, options)?.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Gender, PersonAttributes};
    use crate::error::ResolveError;
    use crate::temporal::DatePrecision;
    use serde_json::json;

    fn person(name: &str, attrs: PersonAttributes) -> Entity {
        Entity::new(name, EntityKind::Person(attrs))
    }

    #[test]
    fn test_arrays_union_primary_first() {
        let a = person(
            "Marpa",
            PersonAttributes {
                roles: vec!["translator".into(), "teacher".into()],
                ..PersonAttributes::default()
            },
        );
        let b = person(
            "Marpa",
            PersonAttributes {
                roles: vec!["farmer".into(), "translator".into()],
                traditions: vec!["Kagyu".into()],
                ..PersonAttributes::default()
            },
        );
        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        let attrs = combined.entity.kind.as_person().unwrap();
        assert_eq!(attrs.roles, ["translator", "teacher", "farmer"]);
        assert_eq!(attrs.traditions, ["Kagyu"]);
        assert!(combined.conflicts.is_empty());
        assert_eq!(combined.entity.id(), a.id());
    }

    #[test]
    fn test_scalar_conflict_follows_confidence() {
        let a = person(
            "Machig",
            PersonAttributes {
                gender: Some(Gender::Male),
                ..PersonAttributes::default()
            },
        )
        .with_confidence(Confidence::clamped(0.4));
        let b = person(
            "Machig",
            PersonAttributes {
                gender: Some(Gender::Female),
                ..PersonAttributes::default()
            },
        )
        .with_confidence(Confidence::clamped(0.9));

        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        assert_eq!(combined.entity.kind.as_person().unwrap().gender, Some(Gender::Female));
        assert_eq!(combined.conflicts.len(), 1);
        assert_eq!(combined.conflicts[0].path, "attributes.gender");
        assert_eq!(combined.conflicts[0].resolved_by, Some(ResolvedBy::HighestConfidence));

        let confidence = combined.entity.confidence.value();
        assert!((confidence - (0.9 * 0.7 + 0.4 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_manual_strategy_requires_resolution() {
        let a = person("Marpa Lotsawa", PersonAttributes::default());
        let b = person("Mar-pa", PersonAttributes::default());
        let manual = MergeOptions::default().with_strategy(ConflictStrategy::Manual);

        let err = combine_entities(&a, &b, &manual).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Conflict(ConflictError::UnresolvedConflict { ref path })
                if path == "canonical_name"
        ));

        let resolved = manual.with_resolution("canonical_name", json!("Marpa Chökyi Lodrö"));
        let combined = combine_entities(&a, &b, &resolved).unwrap();
        assert_eq!(combined.entity.canonical_name, "Marpa Chökyi Lodrö");
        let english = combined.entity.name_variants.get(&Script::English);
        assert!(english.contains(&"Marpa Lotsawa".to_string()));
        assert!(english.contains(&"Mar-pa".to_string()));
    }

    #[test]
    fn test_losing_name_kept_as_variant() {
        let a = person("Marpa Lotsawa", PersonAttributes::default())
            .with_confidence(Confidence::clamped(0.9));
        let b = person("Mar-pa", PersonAttributes::default())
            .with_confidence(Confidence::clamped(0.5));
        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        assert_eq!(combined.entity.canonical_name, "Marpa Lotsawa");
        assert_eq!(combined.entity.name_variants.get(&Script::English), ["Mar-pa"]);
    }

    #[test]
    fn test_birth_year_conflict_needs_decision() {
        let a = person("Milarepa", PersonAttributes::default())
            .with_date("birth", DateInfo::exact(1040));
        let b = person("Milarepa", PersonAttributes::default())
            .with_date("birth", DateInfo::circa(1052));

        let err = combine_entities(&a, &b, &MergeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Conflict(ConflictError::ManualDecisionRequired { count: 1, .. })
        ));

        let options = MergeOptions::default().with_resolution("dates.birth", json!(1052));
        let combined = combine_entities(&a, &b, &options).unwrap();
        let birth = &combined.entity.dates["birth"];
        assert_eq!(birth.year, Some(1052));
        assert_eq!(birth.precision, DatePrecision::Exact);
    }

    #[test]
    fn test_other_date_conflict_prefers_precision() {
        let a = person("Rechungpa", PersonAttributes::default())
            .with_date("ordained", DateInfo::circa(1060));
        let b = person("Rechungpa", PersonAttributes::default())
            .with_date("ordained", DateInfo::exact(1062))
            .with_date("death", DateInfo::exact(1123));
        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        assert_eq!(combined.entity.dates["ordained"].year, Some(1062));
        assert_eq!(combined.entity.dates["death"].year, Some(1123));
        assert_eq!(combined.conflicts[0].severity, ConflictSeverity::Medium);
        assert_eq!(combined.conflicts[0].resolved_by, Some(ResolvedBy::Precision));
    }

    #[test]
    fn test_estimated_dates_do_not_conflict() {
        let a = person("Naropa", PersonAttributes::default())
            .with_date("birth", DateInfo::estimated(1016));
        let b = person("Naropa", PersonAttributes::default())
            .with_date("birth", DateInfo::exact(1012));
        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        assert!(combined.conflicts.is_empty());
        assert_eq!(combined.entity.dates["birth"].year, Some(1012));
    }

    #[test]
    fn test_verified_is_monotonic_and_sources_merge() {
        let a = person("Tilopa", PersonAttributes::default()).with_source("blue-annals");
        let b = person("Tilopa", PersonAttributes::default())
            .with_verified(true)
            .with_source("lives-of-the-84");
        let combined = combine_entities(&a, &b, &MergeOptions::default()).unwrap();
        assert!(combined.entity.verified);
        let sources: Vec<&str> = combined.entity.provenance.sources().collect();
        assert_eq!(sources, ["blue-annals", "lives-of-the-84"]);
    }

    #[test]
    fn test_rejects_kind_mismatch_and_self_merge() {
        let a = person("Samye", PersonAttributes::default());
        let place = Entity::new("Samye", EntityKind::place());
        assert!(matches!(
            combine_entities(&a, &place, &MergeOptions::default()),
            Err(ResolveError::Validation(ValidationError::EntityKindMismatch { .. }))
        ));
        assert!(matches!(
            combine_entities(&a, &a, &MergeOptions::default()),
            Err(ResolveError::Validation(ValidationError::SelfMerge { .. }))
        ));
    }

    #[test]
    fn test_bad_manual_value_is_rejected() {
        let a = person(
            "Machig",
            PersonAttributes {
                gender: Some(Gender::Male),
                ..PersonAttributes::default()
            },
        );
        let b = person(
            "Machig",
            PersonAttributes {
                gender: Some(Gender::Female),
                ..PersonAttributes::default()
            },
        );
        let options = MergeOptions::default().with_resolution("attributes.gender", json!("robot"));
        assert!(matches!(
            combine_entities(&a, &b, &options),
            Err(ResolveError::Validation(ValidationError::InvalidManualResolution { .. }))
        ));
    }
}
