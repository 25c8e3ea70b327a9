//! Extraction collaborator seam.
//!
//! The resolution core never talks to a specific extraction backend. Whatever
//! reads documents (a pattern matcher, an LLM, a human) implements
//! [`CandidateExtractor`] and hands back [`RawEntityMention`]s, which become
//! [`Entity`] records for the detector.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::entity::{Entity, EntityId, EntityKind, EntityType, Script};
use crate::error::{ResolveResult, ValidationError};
use crate::temporal::{DateInfo, DatePrecision, TemporalResolver};
use crate::TARGET_EXTRACT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionJobId(Uuid);

impl ExtractionJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExtractionJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExtractionJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One run of an extractor over a document, and the entities it produced.
///
/// Merges rewrite `entity_ids` so a job keeps pointing at live records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: ExtractionJobId,
    pub source_document: String,
    pub entity_ids: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionJob {
    #[must_use]
    pub fn new(source_document: impl Into<String>, entity_ids: Vec<EntityId>) -> Self {
        Self {
            id: ExtractionJobId::new(),
            source_document: source_document.into(),
            entity_ids,
            created_at: Utc::now(),
        }
    }
}

/// An entity as an extractor saw it, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntityMention {
    pub text: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    /// Byte offsets of the mention in the source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
    pub confidence: f64,
    /// Raw date phrases keyed by label, e.g. `"birth" -> "1012"`.
    #[serde(default)]
    pub dates: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
}

impl RawEntityMention {
    #[must_use]
    pub fn new(text: impl Into<String>, entity_type: EntityType, confidence: f64) -> Self {
        Self {
            text: text.into(),
            entity_type,
            script: None,
            span: None,
            confidence,
            dates: BTreeMap::new(),
            extractor: None,
        }
    }

    #[must_use]
    pub fn with_date(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.dates.insert(label.into(), text.into());
        self
    }

    /// Builds an entity, resolving date phrases with `resolver`.
    ///
    /// A phrase the resolver rejects is kept verbatim as an undated
    /// `relative` entry rather than dropped.
    ///
    /// # Errors
    ///
    /// - `ValidationError::EmptyEntityName` for a blank mention
    /// - `ValidationError::ConfidenceOutOfRange` for a confidence outside [0, 1]
    pub fn into_entity(
        self,
        resolver: &TemporalResolver,
        source_document: Option<&str>,
    ) -> ResolveResult<Entity> {
        let name = self.text.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyEntityName.into());
        }
        let confidence = Confidence::new(self.confidence)?;

        let mut entity =
            Entity::new(name, EntityKind::empty(self.entity_type)).with_confidence(confidence);
        if let Some(script) = self.script {
            entity = entity.with_variant(script, name);
        }
        if let Some(doc) = source_document {
            entity = entity.with_source(doc);
        }
        if let Some(extractor) = self.extractor {
            entity = entity.with_extractor(extractor);
        }

        for (label, phrase) in self.dates {
            let date = match resolver.resolve_date(&phrase, None) {
                Ok(date) => date.with_source(phrase),
                Err(e) => {
                    debug!(
                        target: TARGET_EXTRACT,
                        label = %label,
                        phrase = %phrase,
                        error = %e,
                        "keeping unresolved date phrase"
                    );
                    DateInfo {
                        relative: Some(phrase),
                        precision: DatePrecision::Unknown,
                        confidence: Confidence::zero(),
                        ..DateInfo::default()
                    }
                }
            };
            entity.dates.insert(label, date);
        }
        Ok(entity)
    }
}

/// Anything that turns document text into entity mentions.
pub trait CandidateExtractor: Send + Sync {
    /// Short name recorded in entity provenance.
    fn name(&self) -> &str;

    /// Extracts mentions from `text`.
    ///
    /// # Errors
    ///
    /// Backend-specific; the fallback extractor treats any error as "no result".
    fn extract_candidates(&self, text: &str) -> ResolveResult<Vec<RawEntityMention>>;
}

/// Regex-driven extractor for well-formed text.
#[derive(Debug, Default)]
pub struct PatternExtractor {
    patterns: Vec<(Regex, EntityType, f64)>,
}

impl PatternExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern. Capture group 1, if present, is the mention text;
    /// otherwise the whole match is.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidConfig` if the pattern does not compile, or
    /// `ConfidenceOutOfRange` for a bad confidence.
    pub fn with_pattern(
        mut self,
        pattern: &str,
        entity_type: EntityType,
        confidence: f64,
    ) -> ResolveResult<Self> {
        Confidence::new(confidence)?;
        let regex = Regex::new(pattern).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("bad extraction pattern '{pattern}': {e}"),
        })?;
        self.patterns.push((regex, entity_type, confidence));
        Ok(self)
    }
}

impl CandidateExtractor for PatternExtractor {
    fn name(&self) -> &str {
        "pattern"
    }

    fn extract_candidates(&self, text: &str) -> ResolveResult<Vec<RawEntityMention>> {
        let mut mentions = Vec::new();
        for (regex, entity_type, confidence) in &self.patterns {
            for caps in regex.captures_iter(text) {
                let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let mut mention = RawEntityMention::new(m.as_str(), *entity_type, *confidence);
                mention.span = Some((m.start(), m.end()));
                mention.extractor = Some(self.name().to_string());
                mentions.push(mention);
            }
        }
        mentions.sort_by_key(|m| m.span);
        Ok(mentions)
    }
}

/// Two-stage extractor: the second stage only runs when the first finds
/// nothing or fails.
#[derive(Debug)]
pub struct FallbackExtractor<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackExtractor<P, S>
where
    P: CandidateExtractor,
    S: CandidateExtractor,
{
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P, S> CandidateExtractor for FallbackExtractor<P, S>
where
    P: CandidateExtractor,
    S: CandidateExtractor,
{
    fn name(&self) -> &str {
        "fallback"
    }

    fn extract_candidates(&self, text: &str) -> ResolveResult<Vec<RawEntityMention>> {
        match self.primary.extract_candidates(text) {
            Ok(found) if !found.is_empty() => return Ok(found),
            Ok(_) => {
                let stage = self.primary.name();
                debug!(target: TARGET_EXTRACT, stage, "no candidates, falling back");
            }
            Err(e) => {
                let stage = self.primary.name();
                warn!(target: TARGET_EXTRACT, stage, error = %e, "extractor failed, falling back");
            }
        }
        self.secondary.extract_candidates(text)
    }
}
