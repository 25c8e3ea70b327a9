//! Relationships between entities.
//!
//! Relationships are owned by the graph collaborator. The resolution core only
//! reads them and rewrites their endpoints when two entities merge.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::entity::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipId(Uuid);

impl RelationshipId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RelationshipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of a relationship points at an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Subject,
    Object,
}

/// A directed, typed edge such as "Marpa teacher_of Milarepa".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub subject: EntityId,
    pub predicate: String,
    pub object: EntityId,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
}

impl Relationship {
    #[must_use]
    pub fn new(subject: EntityId, predicate: impl Into<String>, object: EntityId) -> Self {
        Self {
            id: RelationshipId::new(),
            subject,
            predicate: predicate.into(),
            object,
            confidence: Confidence::neutral(),
            source_document: None,
        }
    }

    /// The endpoint id on one side.
    #[must_use]
    pub const fn endpoint(&self, end: Endpoint) -> EntityId {
        match end {
            Endpoint::Subject => self.subject,
            Endpoint::Object => self.object,
        }
    }

    pub fn set_endpoint(&mut self, end: Endpoint, id: EntityId) {
        match end {
            Endpoint::Subject => self.subject = id,
            Endpoint::Object => self.object = id,
        }
    }

    /// True if either end is `id`.
    #[must_use]
    pub fn touches(&self, id: EntityId) -> bool {
        self.subject == id || self.object == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let marpa = EntityId::new();
        let mila = EntityId::new();
        let mut rel = Relationship::new(marpa, "teacher_of", mila);
        assert!(rel.touches(marpa));
        assert_eq!(rel.endpoint(Endpoint::Object), mila);

        let other = EntityId::new();
        rel.set_endpoint(Endpoint::Subject, other);
        assert!(!rel.touches(marpa));
        assert_eq!(rel.subject, other);
    }
}
