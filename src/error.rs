//! Error types for Lotsawa.
//!
//! Errors are strongly typed using thiserror, one enum per failure category,
//! wrapped by [`ResolveError`]. Scoring functions never return these: absent or
//! malformed sub-signals degrade to a neutral value instead. Parsing and merge
//! operations that must produce a committed result fail loudly.

use thiserror::Error;

use crate::entity::EntityId;
use crate::merge::MergeHistoryId;

/// Malformed entity or date input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange { value: f64 },

    #[error("Entity name cannot be empty")]
    EmptyEntityName,

    #[error("Threshold '{name}' value {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange { name: String, value: f64 },

    #[error("Cannot merge a {primary} into a {duplicate}")]
    EntityKindMismatch { primary: String, duplicate: String },

    #[error("Cannot merge entity {id} into itself")]
    SelfMerge { id: EntityId },

    #[error("Event year {event_year} precedes birth year {birth_year}")]
    EventBeforeBirth { birth_year: i32, event_year: i32 },

    #[error("Invalid manual resolution for '{path}': {reason}")]
    InvalidManualResolution { path: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// A numeric value outside its valid calendar domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Rabjung {value} is outside [1, 17]")]
    Rabjung { value: i32 },

    #[error("Year within rabjung {value} is outside [1, 60]")]
    YearInRabjung { value: i32 },

    #[error("Year {value} is outside the supported historical range [{min}, {max}]")]
    GregorianYear { value: i64, min: i32, max: i32 },

    #[error("Century {value} is outside the supported range [1, {max}]")]
    Century { value: i64, max: i32 },
}

/// A referenced record could not be found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Entity not found: {id}")]
    Entity { id: EntityId },

    #[error("No known entity named '{name}'")]
    ReferenceEntity { name: String },

    #[error("Entity '{name}' has no {event} date to resolve against")]
    DatelessReference { name: String, event: String },

    #[error("Merge history not found: {id}")]
    MergeHistory { id: MergeHistoryId },

    #[error("Merge {id} was a hard delete and cannot be undone")]
    HardDeleted { id: MergeHistoryId },
}

/// A merge cannot be committed as requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Conflict on '{path}' requires a manual resolution")]
    UnresolvedConflict { path: String },

    #[error("{count} high-severity conflict(s) require a manual decision: {paths:?}")]
    ManualDecisionRequired { count: usize, paths: Vec<String> },

    #[error("Entity {id} changed concurrently (expected version {expected}, found {actual})")]
    VersionMismatch { id: EntityId, expected: u64, actual: u64 },

    #[error("Merge of {primary} and {duplicate} still conflicting after {attempts} attempt(s)")]
    RetriesExhausted {
        primary: EntityId,
        duplicate: EntityId,
        attempts: u32,
    },
}

/// Date text that cannot be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidDateError {
    #[error("Date text is empty")]
    Empty,

    #[error("Unrecognised date expression: '{text}'")]
    Unparsable { text: String },

    #[error("'{element}-{animal}' is not a year of the sixty-year cycle")]
    ImpossibleCombination { element: String, animal: String },

    #[error("Unknown era: '{name}'")]
    UnknownEra { name: String },
}

/// Errors raised by collaborator stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Top-level error type for Lotsawa.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Invalid date: {0}")]
    InvalidDate(#[from] InvalidDateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ResolveError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a range error.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a conflict error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if this is an invalid-date error.
    #[must_use]
    pub const fn is_invalid_date(&self) -> bool {
        matches!(self, Self::InvalidDate(_))
    }

    /// Returns true if the caller should route the input to human review
    /// instead of retrying.
    #[must_use]
    pub const fn requires_review(&self) -> bool {
        match self {
            Self::Conflict(e) => !matches!(e, ConflictError::VersionMismatch { .. }),
            Self::Validation(_) | Self::Range(_) | Self::InvalidDate(_) => true,
            Self::NotFound(e) => matches!(
                e,
                NotFoundError::ReferenceEntity { .. } | NotFoundError::DatelessReference { .. }
            ),
            Self::Storage(_) => false,
        }
    }
}

/// Result type alias for Lotsawa operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_confidence() {
        let err = ValidationError::ConfidenceOutOfRange { value: 1.5 };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn test_range_error_rabjung() {
        let err: ResolveError = RangeError::Rabjung { value: 18 }.into();
        assert!(err.is_range());
        assert!(err.to_string().contains("18"));
    }

    #[test]
    fn test_not_found_merge_history() {
        let id = MergeHistoryId::new();
        let err: ResolveError = NotFoundError::MergeHistory { id }.into();
        assert!(err.is_not_found());
        assert!(!err.requires_review());
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_conflict_error_routing() {
        let unresolved: ResolveError = ConflictError::UnresolvedConflict {
            path: "attributes.gender".to_string(),
        }
        .into();
        assert!(unresolved.is_conflict());
        assert!(unresolved.requires_review());

        let stale: ResolveError = ConflictError::VersionMismatch {
            id: EntityId::new(),
            expected: 2,
            actual: 3,
        }
        .into();
        assert!(!stale.requires_review());
    }

    #[test]
    fn test_invalid_date_error() {
        let err: ResolveError = InvalidDateError::Unparsable {
            text: "sometime".to_string(),
        }
        .into();
        assert!(err.is_invalid_date());
        assert!(err.requires_review());
        assert!(err.to_string().contains("sometime"));
    }
}
