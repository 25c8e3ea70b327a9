//! Options for detection, merging and corpus scans.
//!
//! Every struct deserializes with defaults for missing fields, so a config file
//! only needs to name what it changes.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ResolveResult, ValidationError};

/// Duplicate detection options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOptions {
    /// Minimum overall score for a pair to be reported.
    pub threshold: f64,
    /// Maximum number of pairs returned by `find_duplicates`.
    pub limit: Option<usize>,
    /// Only compare entities of the same type.
    pub same_type_only: bool,
    /// Pairs whose best name score is below this are skipped outright.
    pub min_name_similarity: f64,
    /// Ignore disputed/unknown dates and drop the 20-year band.
    pub strict_date_matching: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            threshold: 0.70,
            limit: None,
            same_type_only: true,
            min_name_similarity: 0.60,
            strict_date_matching: false,
        }
    }
}

impl DetectionOptions {
    /// Checks both thresholds lie in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ThresholdOutOfRange` naming the bad field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        check_unit("threshold", self.threshold)?;
        check_unit("min_name_similarity", self.min_name_similarity)?;
        Ok(self)
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_same_type_only(mut self, same_type_only: bool) -> Self {
        self.same_type_only = same_type_only;
        self
    }

    #[must_use]
    pub const fn with_strict_dates(mut self, strict: bool) -> Self {
        self.strict_date_matching = strict;
        self
    }
}

/// How scalar conflicts between two merged entities are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Keep the value from the entity with the higher confidence.
    #[default]
    HighestConfidence,
    /// Use `manual_resolutions`; an unresolved conflict fails the merge.
    Manual,
    /// Keep the value from the most recently updated entity.
    Newest,
}

/// Merge options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub conflict_strategy: ConflictStrategy,
    /// Values keyed by attribute path (`canonical_name`, `dates.birth`,
    /// `attributes.region`, ...). They override every strategy.
    pub manual_resolutions: HashMap<String, serde_json::Value>,
    /// Keep the duplicate as a tombstone so the merge can be undone.
    pub soft_delete: bool,
    /// Optimistic commit attempts before giving up.
    pub max_retries: u32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::HighestConfidence,
            manual_resolutions: HashMap::new(),
            soft_delete: true,
            max_retries: 3,
        }
    }
}

impl MergeOptions {
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, path: impl Into<String>, value: serde_json::Value) -> Self {
        self.manual_resolutions.insert(path.into(), value);
        self
    }

    #[must_use]
    pub const fn with_soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }
}

/// Parallel corpus scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker threads scoring rows of the pair matrix.
    pub workers: usize,
    /// Bound of the row queue feeding the workers.
    pub queue_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            queue_capacity: 1024,
        }
    }
}

/// Top-level configuration, loadable from JSON.
///
/// # Examples
///
/// ```
/// use lotsawa::config::{ConflictStrategy, ResolverConfig};
///
/// let cfg = ResolverConfig::from_json_str(
///     r#"{"detection": {"threshold": 0.8}, "merge": {"conflict_strategy": "newest"}}"#,
/// )
/// .unwrap();
/// assert_eq!(cfg.detection.threshold, 0.8);
/// assert_eq!(cfg.detection.min_name_similarity, 0.6);
/// assert_eq!(cfg.merge.conflict_strategy, ConflictStrategy::Newest);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub detection: DetectionOptions,
    pub merge: MergeOptions,
    pub scan: ScanConfig,
}

impl ResolverConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidConfig` for malformed JSON,
    /// `ValidationError::ThresholdOutOfRange` for out-of-range thresholds.
    pub fn from_json_str(json: &str) -> ResolveResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        Ok(cfg.validate()?)
    }

    /// Reads and validates a JSON file.
    ///
    /// # Errors
    ///
    /// As [`Self::from_json_str`], plus `InvalidConfig` if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> ResolveResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    /// Checks thresholds and clamps worker counts to at least one.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ThresholdOutOfRange` naming the bad field.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.detection = self.detection.validate()?;
        self.scan.workers = self.scan.workers.max(1);
        self.scan.queue_capacity = self.scan.queue_capacity.max(1);
        Ok(self)
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::ThresholdOutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let d = DetectionOptions::default();
        assert_eq!(d.threshold, 0.70);
        assert_eq!(d.min_name_similarity, 0.60);
        assert!(d.same_type_only);
        assert!(!d.strict_date_matching);

        let m = MergeOptions::default();
        assert_eq!(m.conflict_strategy, ConflictStrategy::HighestConfidence);
        assert!(m.soft_delete);
        assert_eq!(m.max_retries, 3);

        assert!(ScanConfig::default().workers >= 1);
    }

    #[test]
    fn test_empty_json_is_default() {
        let cfg = ResolverConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.detection, DetectionOptions::default());
        assert_eq!(cfg.merge, MergeOptions::default());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let err =
            ResolverConfig::from_json_str(r#"{"detection": {"threshold": 1.5}}"#).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ResolverConfig::from_json_str("{detection").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ResolveError::Validation(ValidationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let cfg = ResolverConfig::from_json_str(r#"{"scan": {"workers": 0, "queue_capacity": 0}}"#)
            .unwrap();
        assert_eq!(cfg.scan.workers, 1);
        assert_eq!(cfg.scan.queue_capacity, 1);
    }

    #[test]
    fn test_manual_resolutions_parse() {
        let json = r#"{"merge": {
            "conflict_strategy": "manual",
            "manual_resolutions": {"dates.birth": {"year": 1012}}
        }}"#;
        let cfg = ResolverConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.merge.conflict_strategy, ConflictStrategy::Manual);
        assert!(cfg.merge.manual_resolutions.contains_key("dates.birth"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"detection": {{"same_type_only": false}}}}"#).unwrap();
        let cfg = ResolverConfig::from_path(file.path()).unwrap();
        assert!(!cfg.detection.same_type_only);

        let missing = ResolverConfig::from_path("/nonexistent/lotsawa.json").unwrap_err();
        assert!(missing.is_validation());
    }
}
