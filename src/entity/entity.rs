//! Entity records and identity.
//!
//! An entity is one candidate node of the knowledge graph: a person, place,
//! text or other thing mentioned in a source document. Several extracted
//! entities may describe the same real-world referent; the detector finds them
//! and the merger folds them into one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::entity::kind::{EntityKind, EntityType};
use crate::entity::names::{NameVariants, Script};
use crate::error::{RangeError, ResolveResult, ValidationError};
use crate::temporal::DateInfo;

/// Stable entity identifier.
///
/// # Examples
///
/// ```
/// use lotsawa::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Where an entity record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,

    /// Name of the extractor that produced the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Documents of records merged into this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_sources: Vec<String>,
}

impl Provenance {
    fn now() -> Self {
        let now = Utc::now();
        Self {
            source_document: None,
            extractor: None,
            created_at: now,
            updated_at: now,
            additional_sources: Vec::new(),
        }
    }

    /// Every document this record was built from, primary first.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.source_document
            .iter()
            .chain(self.additional_sources.iter())
            .map(String::as_str)
    }
}

/// A candidate knowledge-graph node.
///
/// Equality and hashing use the id only.
///
/// # Examples
///
/// ```
/// use lotsawa::{DateInfo, Entity, EntityKind, Script};
///
/// let marpa = Entity::new("Marpa Lotsawa", EntityKind::person())
///     .with_variant(Script::Wylie, "mar pa chos kyi blo gros")
///     .with_date("birth", DateInfo::circa(1012));
/// assert_eq!(marpa.all_names().len(), 2);
/// assert_eq!(marpa.version, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,

    pub canonical_name: String,

    #[serde(default)]
    pub name_variants: NameVariants,

    pub kind: EntityKind,

    /// Dates keyed by label (`birth`, `death`, `founded`, `composed`, ...).
    #[serde(default)]
    pub dates: BTreeMap<String, DateInfo>,

    #[serde(default)]
    pub confidence: Confidence,

    #[serde(default)]
    pub verified: bool,

    pub provenance: Provenance,

    /// Incremented on every stored change; used for optimistic commits.
    pub version: u64,
}

impl Entity {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self::with_id(EntityId::new(), name, kind)
    }

    /// Creates an entity with a caller-chosen id (imports, fixtures).
    #[must_use]
    pub fn with_id(id: EntityId, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id,
            canonical_name: name.into(),
            name_variants: NameVariants::new(),
            kind,
            dates: BTreeMap::new(),
            confidence: Confidence::neutral(),
            verified: false,
            provenance: Provenance::now(),
            version: 1,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    #[must_use]
    pub fn with_variant(mut self, script: Script, name: impl Into<String>) -> Self {
        self.name_variants.add(script, name);
        self
    }

    #[must_use]
    pub fn with_date(mut self, label: impl Into<String>, date: DateInfo) -> Self {
        self.dates.insert(label.into(), date);
        self
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub const fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    #[must_use]
    pub fn with_source(mut self, document: impl Into<String>) -> Self {
        self.provenance.source_document = Some(document.into());
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: impl Into<String>) -> Self {
        self.provenance.extractor = Some(extractor.into());
        self
    }

    /// Adds a name variant; bumps the version if it was new.
    pub fn add_variant(&mut self, script: Script, name: impl Into<String>) -> bool {
        let added = self.name_variants.add(script, name);
        if added {
            self.touch();
        }
        added
    }

    /// Canonical name followed by every variant, without exact repeats.
    #[must_use]
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = vec![self.canonical_name.as_str()];
        for name in self.name_variants.names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Year of a labelled date, if one can be derived.
    #[must_use]
    pub fn year_of(&self, label: &str) -> Option<i32> {
        self.dates.get(label).and_then(DateInfo::effective_year)
    }

    /// Marks a stored change.
    pub fn touch(&mut self) {
        self.provenance.updated_at = Utc::now();
        self.version += 1;
    }

    /// Checks the record's invariants.
    ///
    /// # Errors
    ///
    /// - `ValidationError::EmptyEntityName` if the canonical name is blank
    /// - `RangeError` if a date carries an invalid Tibetan year
    pub fn validate(&self) -> ResolveResult<()> {
        if self.canonical_name.trim().is_empty() {
            return Err(ValidationError::EmptyEntityName.into());
        }
        for date in self.dates.values() {
            if let Some(t) = date.tibetan_year {
                if !(1..=17).contains(&t.rabjung) {
                    return Err(RangeError::Rabjung {
                        value: i32::from(t.rabjung),
                    }
                    .into());
                }
                if !(1..=60).contains(&t.year) {
                    return Err(RangeError::YearInRabjung {
                        value: i32::from(t.year),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::{Animal, Element, TibetanYear};

    #[test]
    fn test_entity_id_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn test_entity_creation_defaults() {
        let e = Entity::new("Naropa", EntityKind::person());
        assert_eq!(e.version, 1);
        assert_eq!(e.entity_type(), EntityType::Person);
        assert_eq!(e.confidence, Confidence::neutral());
        assert!(!e.verified);
        assert!(e.name_variants.is_empty());
    }

    #[test]
    fn test_all_names_skips_repeats() {
        let e = Entity::new("Marpa", EntityKind::person())
            .with_variant(Script::English, "Marpa")
            .with_variant(Script::English, "Marpa the Translator")
            .with_variant(Script::Wylie, "mar pa");
        assert_eq!(e.all_names(), vec!["Marpa", "Marpa the Translator", "mar pa"]);
    }

    #[test]
    fn test_add_variant_bumps_version_once() {
        let mut e = Entity::new("Tilopa", EntityKind::person());
        assert!(e.add_variant(Script::Sanskrit, "Tillipa"));
        assert!(!e.add_variant(Script::Sanskrit, "Tillipa"));
        assert_eq!(e.version, 2);
    }

    #[test]
    fn test_equality_is_by_id() {
        let id = EntityId::new();
        let a = Entity::with_id(id, "Sakya", EntityKind::place());
        let mut b = Entity::with_id(id, "Sa skya", EntityKind::institution());
        b.version = 9;
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate() {
        assert!(Entity::new("  ", EntityKind::text()).validate().unwrap_err().is_validation());

        let bad = Entity::new("Bad date", EntityKind::event()).with_date(
            "held",
            DateInfo {
                tibetan_year: Some(TibetanYear {
                    rabjung: 18,
                    year: 1,
                    element: Element::Fire,
                    animal: Animal::Rabbit,
                }),
                ..DateInfo::default()
            },
        );
        assert!(bad.validate().unwrap_err().is_range());

        let good = Entity::new("Samye", EntityKind::institution())
            .with_date("founded", DateInfo::circa(779));
        assert!(good.validate().is_ok());
        assert_eq!(good.year_of("founded"), Some(779));
    }

    #[test]
    fn test_serialization_keeps_id() {
        let e = Entity::new("Gampopa", EntityKind::person())
            .with_date("birth", DateInfo::exact(1079));
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), e.id());
        assert_eq!(back.dates["birth"].year, Some(1079));
        assert_eq!(back.kind, EntityKind::person());
    }
}
