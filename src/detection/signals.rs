//! Non-name duplicate signals.
//!
//! Each signal is a total function returning a value in [0, 1]. Missing or
//! incomparable data yields exactly [`NEUTRAL`], which the detector weights at
//! half strength.

use std::collections::HashSet;

use crate::entity::{Entity, EntityKind};
use crate::temporal::{DateInfo, DatePrecision};

/// Score for "no data".
pub const NEUTRAL: f64 = 0.5;

/// Year-difference bands: same year, circa, reasonable, loose.
fn year_band(diff: u32, strict: bool) -> f64 {
    match diff {
        0 => 1.0,
        1..=5 => 0.85,
        6..=10 => 0.7,
        11..=20 if !strict => 0.5,
        _ => 0.0,
    }
}

fn comparable_year(date: &DateInfo, strict: bool) -> Option<i32> {
    if strict && matches!(date.precision, DatePrecision::Disputed | DatePrecision::Unknown) {
        return None;
    }
    date.effective_year()
}

/// Average band score over date labels both entities carry.
#[must_use]
pub fn date_similarity(e1: &Entity, e2: &Entity, strict: bool) -> f64 {
    let scores: Vec<f64> = e1
        .dates
        .iter()
        .filter_map(|(label, d1)| {
            let d2 = e2.dates.get(label)?;
            let y1 = comparable_year(d1, strict)?;
            let y2 = comparable_year(d2, strict)?;
            Some(year_band(y1.abs_diff(y2), strict))
        })
        .collect();

    if scores.is_empty() {
        return NEUTRAL;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = scores.len() as f64;
    scores.iter().sum::<f64>() / n
}

fn folded_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Jaccard index, or `None` if either side is empty.
fn jaccard(a: &[String], b: &[String]) -> Option<f64> {
    let a = folded_set(a);
    let b = folded_set(b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let inter = a.intersection(&b).count();
    let union = a.union(&b).count();
    #[allow(clippy::cast_precision_loss)]
    Some(inter as f64 / union as f64)
}

fn same_text(a: Option<&str>, b: Option<&str>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.trim().eq_ignore_ascii_case(b.trim())),
        _ => None,
    }
}

fn equality_score(same: Option<bool>) -> Option<f64> {
    same.map(|s| if s { 1.0 } else { 0.0 })
}

/// Location signal.
///
/// People compare affiliations. Places compare region, then country; a place
/// pair with data on both sides but no shared region or country scores 0.2.
/// Events, institutions and artifacts compare their single location.
#[must_use]
pub fn location_similarity(e1: &Entity, e2: &Entity) -> f64 {
    match (&e1.kind, &e2.kind) {
        (EntityKind::Person(a), EntityKind::Person(b)) => {
            jaccard(&a.affiliations, &b.affiliations).unwrap_or(NEUTRAL)
        }
        (EntityKind::Place(a), EntityKind::Place(b)) => {
            let region = same_text(a.region.as_deref(), b.region.as_deref());
            let country = same_text(a.country.as_deref(), b.country.as_deref());
            match (region, country) {
                (Some(true), _) => 0.8,
                (_, Some(true)) => 0.6,
                (None, None) => NEUTRAL,
                _ => 0.2,
            }
        }
        _ => equality_score(same_text(e1.kind.location(), e2.kind.location())).unwrap_or(NEUTRAL),
    }
}

/// Relationship-graph overlap.
///
/// The detector has no graph access, so this is always neutral.
#[must_use]
pub const fn relationship_similarity(_e1: &Entity, _e2: &Entity) -> f64 {
    NEUTRAL
}

fn mean(parts: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        return NEUTRAL;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = present.len() as f64;
    present.iter().sum::<f64>() / n
}

/// Type-specific attribute agreement; mean of the sub-signals that have data.
#[must_use]
pub fn attribute_similarity(e1: &Entity, e2: &Entity) -> f64 {
    match (&e1.kind, &e2.kind) {
        (EntityKind::Person(a), EntityKind::Person(b)) => {
            let gender = match (a.gender, b.gender) {
                (Some(x), Some(y)) => Some(x == y),
                _ => None,
            };
            mean(&[
                equality_score(gender),
                jaccard(&a.traditions, &b.traditions),
                jaccard(&a.roles, &b.roles),
            ])
        }
        (EntityKind::Place(a), EntityKind::Place(b)) => mean(&[
            equality_score(same_text(a.place_type.as_deref(), b.place_type.as_deref())),
            equality_score(same_text(a.region.as_deref(), b.region.as_deref())),
        ]),
        (EntityKind::Text(a), EntityKind::Text(b)) => mean(&[
            equality_score(same_text(a.text_type.as_deref(), b.text_type.as_deref())),
            jaccard(&a.authors, &b.authors),
        ]),
        (EntityKind::Institution(a), EntityKind::Institution(b)) => mean(&[
            equality_score(same_text(
                a.institution_type.as_deref(),
                b.institution_type.as_deref(),
            )),
            jaccard(&a.traditions, &b.traditions),
        ]),
        (EntityKind::Deity(a), EntityKind::Deity(b)) => mean(&[
            equality_score(same_text(a.deity_type.as_deref(), b.deity_type.as_deref())),
            jaccard(&a.traditions, &b.traditions),
        ]),
        (EntityKind::Lineage(a), EntityKind::Lineage(b)) => mean(&[equality_score(same_text(
            a.tradition.as_deref(),
            b.tradition.as_deref(),
        ))]),
        (EntityKind::Event(a), EntityKind::Event(b)) => mean(&[equality_score(same_text(
            a.event_type.as_deref(),
            b.event_type.as_deref(),
        ))]),
        (EntityKind::Artifact(a), EntityKind::Artifact(b)) => mean(&[
            equality_score(same_text(a.artifact_type.as_deref(), b.artifact_type.as_deref())),
            equality_score(same_text(a.material.as_deref(), b.material.as_deref())),
        ]),
        _ => NEUTRAL,
    }
}
