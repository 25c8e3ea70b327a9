//! Name similarity scoring.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::Entity;
use crate::fuzzy::normalize::{normalize_name, words};
use crate::fuzzy::phonetic::phonetic_similarity;
use crate::fuzzy::transliteration::{folded_similarity, is_known_transliteration};
use crate::TARGET_MATCH;

/// Score returned for a Wylie/phonetic table hit.
pub const TRANSLITERATION_SCORE: f64 = 0.98;

/// Confidence attached to a Wylie/phonetic table hit.
pub const TRANSLITERATION_CONFIDENCE: f64 = 0.95;

const LEVENSHTEIN_WEIGHT: f64 = 0.5;
const PHONETIC_WEIGHT: f64 = 0.2;
const WORD_WEIGHT: f64 = 0.2;
const TRANSLIT_WEIGHT: f64 = 0.1;

/// How two names were judged similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Levenshtein,
    Phonetic,
    WordOrder,
    Transliteration,
    Partial,
}

impl MatchType {
    /// Multiplier applied to the score to obtain the match confidence.
    ///
    /// Transliteration hits carry [`TRANSLITERATION_CONFIDENCE`] instead.
    #[must_use]
    pub const fn confidence_factor(self) -> f64 {
        match self {
            Self::Exact | Self::Levenshtein | Self::Transliteration => 1.0,
            Self::Phonetic => 0.9,
            Self::WordOrder => 0.95,
            Self::Partial => 0.85,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Levenshtein => "levenshtein",
            Self::Phonetic => "phonetic",
            Self::WordOrder => "word_order",
            Self::Transliteration => "transliteration",
            Self::Partial => "partial",
        };
        write!(f, "{s}")
    }
}

/// Per-component scores behind a [`SimilarityScore`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub levenshtein: f64,
    pub phonetic: f64,
    pub word: f64,
    pub transliteration: f64,
    pub length_penalty: f64,
}

impl ComponentBreakdown {
    const fn perfect() -> Self {
        Self {
            levenshtein: 1.0,
            phonetic: 1.0,
            word: 1.0,
            transliteration: 1.0,
            length_penalty: 1.0,
        }
    }
}

/// Result of comparing two names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Similarity in [0, 1]; symmetric in its arguments.
    pub score: f64,
    pub match_type: MatchType,
    pub confidence: f64,
    pub components: ComponentBreakdown,
}

impl SimilarityScore {
    fn exact() -> Self {
        Self {
            score: 1.0,
            match_type: MatchType::Exact,
            confidence: 1.0,
            components: ComponentBreakdown::perfect(),
        }
    }

    /// Verdict band for this score.
    #[must_use]
    pub fn verdict(&self) -> NameVerdict {
        NameVerdict::from_score(self.score)
    }
}

/// Human-facing interpretation of a name score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameVerdict {
    VeryLikelySame,
    LikelySame,
    PossiblySame,
    ProbablyDifferent,
}

impl NameVerdict {
    /// Bands: ≥0.95, ≥0.85, ≥0.75, below.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            Self::VeryLikelySame
        } else if score >= 0.85 {
            Self::LikelySame
        } else if score >= 0.75 {
            Self::PossiblySame
        } else {
            Self::ProbablyDifferent
        }
    }
}

/// A candidate returned by [`FuzzyMatcher::find_similar_names`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMatch {
    pub name: String,
    pub similarity: SimilarityScore,
    pub verdict: NameVerdict,
}

/// Filtering for [`FuzzyMatcher::find_similar_names`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// Minimum score to report.
    pub threshold: f64,
    pub limit: Option<usize>,
}

impl FindOptions {
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
}

fn length_penalty(len_a: usize, len_b: usize) -> f64 {
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    let ratio = len_a.min(len_b) as f64 / longest as f64;
    if ratio >= 0.7 {
        1.0
    } else if ratio >= 0.5 {
        0.95
    } else if ratio >= 0.3 {
        0.85
    } else {
        0.7
    }
}

fn levenshtein_similarity(a: &str, b: &str, longest: usize) -> f64 {
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / longest as f64
}

fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn is_strict_subset(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> bool {
    !a.is_empty() && a.len() < b.len() && a.is_subset(b)
}

/// Scores name similarity.
///
/// Stateless; one instance can be shared across threads.
///
/// # Examples
///
/// ```
/// use lotsawa::fuzzy::{FuzzyMatcher, MatchType};
///
/// let matcher = FuzzyMatcher::new();
/// let score = matcher.calculate_similarity("Mar-pa", "Marpa Lotsawa");
/// assert_eq!(score.match_type, MatchType::Transliteration);
/// assert!((score.score - 0.98).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher;

impl FuzzyMatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares two raw names.
    #[must_use]
    pub fn calculate_similarity(&self, name1: &str, name2: &str) -> SimilarityScore {
        let a = normalize_name(name1);
        let b = normalize_name(name2);
        self.score_normalized(&a, &b)
    }

    fn score_normalized(&self, a: &str, b: &str) -> SimilarityScore {
        if a == b {
            return SimilarityScore::exact();
        }

        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let words_a = words(a);
        let words_b = words(b);
        let set_a: BTreeSet<&str> = words_a.iter().copied().collect();
        let set_b: BTreeSet<&str> = words_b.iter().copied().collect();

        let components = ComponentBreakdown {
            levenshtein: levenshtein_similarity(a, b, len_a.max(len_b)),
            phonetic: phonetic_similarity(&words_a, &words_b),
            word: jaccard(&set_a, &set_b),
            transliteration: folded_similarity(a, b),
            length_penalty: length_penalty(len_a, len_b),
        };

        if is_known_transliteration(a, b) {
            trace!(target: TARGET_MATCH, a, b, "transliteration table hit");
            return SimilarityScore {
                score: TRANSLITERATION_SCORE,
                match_type: MatchType::Transliteration,
                confidence: TRANSLITERATION_CONFIDENCE,
                components,
            };
        }

        let weighted = components.levenshtein * LEVENSHTEIN_WEIGHT
            + components.phonetic * PHONETIC_WEIGHT
            + components.word * WORD_WEIGHT
            + components.transliteration * TRANSLIT_WEIGHT;
        let score = (weighted * components.length_penalty).clamp(0.0, 1.0);

        let lev = components.levenshtein;
        let phonetic_wins = components.phonetic > lev && components.phonetic > 0.85;
        let word_wins = components.word > lev && components.word > 0.85;
        let match_type = match (phonetic_wins, word_wins) {
            (true, true) if components.word >= components.phonetic => MatchType::WordOrder,
            (true, _) => MatchType::Phonetic,
            (false, true) => MatchType::WordOrder,
            (false, false)
                if is_strict_subset(&set_a, &set_b) || is_strict_subset(&set_b, &set_a) =>
            {
                MatchType::Partial
            }
            (false, false) => MatchType::Levenshtein,
        };

        SimilarityScore {
            score,
            match_type,
            confidence: (score * match_type.confidence_factor()).clamp(0.0, 1.0),
            components,
        }
    }

    /// Scores every candidate against `target`, keeping those at or above the
    /// threshold, sorted by descending score.
    #[must_use]
    pub fn find_similar_names<S: AsRef<str>>(
        &self,
        target: &str,
        candidates: &[S],
        options: FindOptions,
    ) -> Vec<NameMatch> {
        let normalized_target = normalize_name(target);
        let mut matches: Vec<NameMatch> = candidates
            .iter()
            .filter_map(|candidate| {
                let name = candidate.as_ref();
                let similarity = self.score_normalized(&normalized_target, &normalize_name(name));
                (similarity.score >= options.threshold).then(|| NameMatch {
                    name: name.to_string(),
                    verdict: similarity.verdict(),
                    similarity,
                })
            })
            .collect();

        matches.sort_by(|x, y| y.similarity.score.total_cmp(&x.similarity.score));
        if let Some(limit) = options.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Best score over the cross product of both entities' names.
    #[must_use]
    pub fn compare_entities(&self, e1: &Entity, e2: &Entity) -> SimilarityScore {
        let names1 = normalized_names(e1);
        let names2 = normalized_names(e2);

        let mut best: Option<SimilarityScore> = None;
        for a in &names1 {
            for b in &names2 {
                let candidate = self.score_normalized(a, b);
                if candidate.score >= 1.0 {
                    return candidate;
                }
                if best.as_ref().map_or(true, |s| candidate.score > s.score) {
                    best = Some(candidate);
                }
            }
        }
        best.unwrap_or(SimilarityScore {
            score: 0.0,
            match_type: MatchType::Levenshtein,
            confidence: 0.0,
            components: ComponentBreakdown::default(),
        })
    }
}

fn normalized_names(entity: &Entity) -> Vec<String> {
    let mut seen = BTreeSet::new();
    entity
        .all_names()
        .into_iter()
        .map(normalize_name)
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}
