//! Entity layer: identity, typed attributes, name variants and relationships.

#[allow(clippy::module_inception)]
pub mod entity;
pub mod kind;
pub mod names;
pub mod relationship;

pub use entity::{Entity, EntityId, Provenance};
pub use kind::{
    ArtifactAttributes, DeityAttributes, EntityKind, EntityType, EventAttributes, Gender,
    InstitutionAttributes, LineageAttributes, PersonAttributes, PlaceAttributes, TextAttributes,
};
pub use names::{NameVariants, Script};
pub use relationship::{Endpoint, Relationship, RelationshipId};
