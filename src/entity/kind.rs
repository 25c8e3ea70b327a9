//! Entity kinds and their typed attribute records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of an entity, without attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityType {
    Person,
    Place,
    Text,
    Event,
    Institution,
    Deity,
    Lineage,
    Artifact,
}

impl EntityType {
    pub const ALL: [Self; 8] = [
        Self::Person,
        Self::Place,
        Self::Text,
        Self::Event,
        Self::Institution,
        Self::Deity,
        Self::Lineage,
        Self::Artifact,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Place => "place",
            Self::Text => "text",
            Self::Event => "event",
            Self::Institution => "institution",
            Self::Deity => "deity",
            Self::Lineage => "lineage",
            Self::Artifact => "artifact",
        }
    }
}

impl TryFrom<String> for EntityType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err("entity type cannot be empty".to_string());
        }
        if value.eq_ignore_ascii_case("location") {
            return Ok(Self::Place);
        }
        if value.eq_ignore_ascii_case("organization") || value.eq_ignore_ascii_case("monastery") {
            return Ok(Self::Institution);
        }
        Self::ALL
            .into_iter()
            .find(|t| value.eq_ignore_ascii_case(t.as_str()))
            .ok_or_else(|| {
                format!(
                    "unknown entity type: {value}. Use one of person, place, text, event, \
                     institution, deity, lineage, artifact"
                )
            })
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub traditions: Vec<String>,
    pub roles: Vec<String>,
    /// Monasteries, courts and other places the person was attached to.
    pub affiliations: Vec<String>,
    pub titles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub significance: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub authors: Vec<String>,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub participants: Vec<String>,
    pub significance: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub traditions: Vec<String>,
    pub founders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeityAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deity_type: Option<String>,
    pub traditions: Vec<String>,
    pub iconography: Vec<String>,
    pub aspects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradition: Option<String>,
    pub founders: Vec<String>,
    pub teachings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub significance: Vec<String>,
}

/// What an entity is, with the attributes that only make sense for that kind.
///
/// Serialized as `{"type": "person", "attributes": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attributes", rename_all = "snake_case")]
pub enum EntityKind {
    Person(PersonAttributes),
    Place(PlaceAttributes),
    Text(TextAttributes),
    Event(EventAttributes),
    Institution(InstitutionAttributes),
    Deity(DeityAttributes),
    Lineage(LineageAttributes),
    Artifact(ArtifactAttributes),
}

impl EntityKind {
    #[must_use]
    pub fn person() -> Self {
        Self::Person(PersonAttributes::default())
    }

    #[must_use]
    pub fn place() -> Self {
        Self::Place(PlaceAttributes::default())
    }

    #[must_use]
    pub fn text() -> Self {
        Self::Text(TextAttributes::default())
    }

    #[must_use]
    pub fn event() -> Self {
        Self::Event(EventAttributes::default())
    }

    #[must_use]
    pub fn institution() -> Self {
        Self::Institution(InstitutionAttributes::default())
    }

    #[must_use]
    pub fn deity() -> Self {
        Self::Deity(DeityAttributes::default())
    }

    #[must_use]
    pub fn lineage() -> Self {
        Self::Lineage(LineageAttributes::default())
    }

    #[must_use]
    pub fn artifact() -> Self {
        Self::Artifact(ArtifactAttributes::default())
    }

    /// Empty attribute record for a type.
    #[must_use]
    pub fn empty(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Person => Self::person(),
            EntityType::Place => Self::place(),
            EntityType::Text => Self::text(),
            EntityType::Event => Self::event(),
            EntityType::Institution => Self::institution(),
            EntityType::Deity => Self::deity(),
            EntityType::Lineage => Self::lineage(),
            EntityType::Artifact => Self::artifact(),
        }
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Person(_) => EntityType::Person,
            Self::Place(_) => EntityType::Place,
            Self::Text(_) => EntityType::Text,
            Self::Event(_) => EntityType::Event,
            Self::Institution(_) => EntityType::Institution,
            Self::Deity(_) => EntityType::Deity,
            Self::Lineage(_) => EntityType::Lineage,
            Self::Artifact(_) => EntityType::Artifact,
        }
    }

    #[must_use]
    pub const fn as_person(&self) -> Option<&PersonAttributes> {
        match self {
            Self::Person(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_place(&self) -> Option<&PlaceAttributes> {
        match self {
            Self::Place(p) => Some(p),
            _ => None,
        }
    }

    /// A single location string, for kinds that carry one.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Event(e) => e.location.as_deref(),
            Self::Institution(i) => i.location.as_deref(),
            Self::Artifact(a) => a.location.as_deref(),
            _ => None,
        }
    }
}

impl From<EntityType> for EntityKind {
    fn from(value: EntityType) -> Self {
        Self::empty(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_serde_is_string() {
        let json = serde_json::to_value(EntityType::Deity).unwrap();
        assert_eq!(json, serde_json::json!("deity"));

        let parsed: EntityType = serde_json::from_str("\"Person\"").unwrap();
        assert_eq!(parsed, EntityType::Person);

        let alias: EntityType = serde_json::from_str("\"location\"").unwrap();
        assert_eq!(alias, EntityType::Place);

        let unknown: Result<EntityType, _> = serde_json::from_str("\"persn\"");
        assert!(unknown.is_err());
    }

    #[test]
    fn test_kind_serialization_is_adjacently_tagged() {
        let kind = EntityKind::Place(PlaceAttributes {
            region: Some("Lhodrak".to_string()),
            ..PlaceAttributes::default()
        });
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "place");
        assert_eq!(json["attributes"]["region"], "Lhodrak");

        let back: EntityKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn test_kind_missing_attributes_default() {
        let kind: EntityKind =
            serde_json::from_str(r#"{"type": "person", "attributes": {}}"#).unwrap();
        assert_eq!(kind, EntityKind::person());
    }

    #[test]
    fn test_entity_type_of_kind() {
        for t in EntityType::ALL {
            assert_eq!(EntityKind::empty(t).entity_type(), t);
        }
    }
}
