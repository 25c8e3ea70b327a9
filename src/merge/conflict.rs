//! Merge conflicts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much a conflict matters.
///
/// `High` conflicts (disagreeing birth or death years) block a merge until
/// the caller supplies a manual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Who settled a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Manual,
    HighestConfidence,
    Newest,
    /// Date conflicts: the more precise (then more confident) date wins.
    Precision,
}

/// Two entities disagreeing on one attribute path.
///
/// Paths look like `canonical_name`, `attributes.gender` or `dates.birth`;
/// they are the keys callers use in `MergeOptions::manual_resolutions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub path: String,
    pub primary_value: Value,
    pub duplicate_value: Value,
    pub severity: ConflictSeverity,
    /// `None` while the conflict is still open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<ResolvedBy>,
}

impl MergeConflict {
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        primary_value: Value,
        duplicate_value: Value,
        severity: ConflictSeverity,
    ) -> Self {
        Self {
            path: path.into(),
            primary_value,
            duplicate_value,
            severity,
            resolved_value: None,
            resolved_by: None,
        }
    }

    #[must_use]
    pub fn resolved(mut self, value: Value, by: ResolvedBy) -> Self {
        self.resolved_value = Some(value);
        self.resolved_by = Some(by);
        self
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved_value.is_some()
    }
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflict on '{}': {} vs {}",
            self.severity, self.path, self.primary_value, self.duplicate_value
        )
    }
}
