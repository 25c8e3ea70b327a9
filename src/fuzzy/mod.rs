//! Fuzzy name matching for Tibetan, Sanskrit and English name variants.
//!
//! Combines Levenshtein edit distance, Soundex, word-set overlap and a
//! Wylie/phonetic transliteration table into one symmetric similarity score.

pub mod matcher;
pub mod normalize;
pub mod phonetic;
pub mod transliteration;

pub use matcher::{
    ComponentBreakdown, FindOptions, FuzzyMatcher, MatchType, NameMatch, NameVerdict,
    SimilarityScore,
};
pub use normalize::normalize_name;
pub use phonetic::soundex;
