//! Name normalization.
//!
//! Pipeline: lowercase, strip diacritics (fixed table first, then NFD with
//! combining marks dropped), strip honorifics, strip punctuation (hyphens,
//! underscores, slashes and the Tibetan tsheg become spaces), collapse
//! whitespace.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Characters NFD does not decompose the way romanized Tibetan and Sanskrit need.
const DIACRITIC_MAP: &[(char, &str)] = &[
    ('ā', "a"),
    ('ī', "i"),
    ('ū', "u"),
    ('ṛ', "r"),
    ('ṝ', "r"),
    ('ḷ', "l"),
    ('ṃ', "m"),
    ('ṁ', "m"),
    ('ḥ', "h"),
    ('ṅ', "n"),
    ('ñ', "n"),
    ('ṭ', "t"),
    ('ḍ', "d"),
    ('ṇ', "n"),
    ('ś', "sh"),
    ('ṣ', "sh"),
    ('ö', "o"),
    ('ü', "u"),
    ('ø', "o"),
    ('æ', "ae"),
    ('ß', "ss"),
    ('\u{2019}', ""),
    ('\u{02BC}', ""),
];

/// Titles and honorifics that do not identify a person.
pub const HONORIFICS: &[&str] = &[
    "rinpoche",
    "lama",
    "geshe",
    "khenpo",
    "khenchen",
    "tulku",
    "jetsun",
    "jetsunma",
    "je",
    "lotsawa",
    "lopon",
    "acharya",
    "kyabje",
    "venerable",
    "holiness",
];

/// Latin combining marks. Tibetan vowel signs are combining too and must survive.
const COMBINING_DIACRITICS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Punctuation collapsed to a space rather than removed.
const SEPARATORS: &[char] = &['-', '_', '/', '\u{0F0B}', '\u{0F0D}'];

fn honorific_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives = HONORIFICS
            .iter()
            .map(|h| regex::escape(&strip_diacritics(h)))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{alternatives})\b"))
            .unwrap_or_else(|e| panic!("invalid honorific pattern: {e}"))
    })
}

/// Removes diacritics using the fixed table, then NFD decomposition.
///
/// Only Latin combining marks are dropped, so Tibetan script passes through.
#[must_use]
pub fn strip_diacritics(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| {
            DIACRITIC_MAP
                .iter()
                .find(|(from, _)| *from == c)
                .map_or_else(|| c.to_string(), |(_, to)| (*to).to_string())
        })
        .collect();
    mapped.nfd().filter(|c| !COMBINING_DIACRITICS.contains(c)).collect()
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if SEPARATORS.contains(&c) {
                Some(' ')
            } else if c.is_alphanumeric() || c.is_whitespace() {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a name for comparison.
///
/// If stripping honorifics would leave nothing (a name that *is* a title, such
/// as "Lama"), the honorific is kept.
///
/// # Examples
///
/// ```
/// use lotsawa::fuzzy::normalize_name;
///
/// assert_eq!(normalize_name("Marpa Lotsāwa"), "marpa");
/// assert_eq!(normalize_name("Mar-pa"), "mar pa");
/// assert_eq!(normalize_name("  Jetsun   Milarepa! "), "milarepa");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let plain = strip_diacritics(&lowered);
    let without_titles = honorific_pattern().replace_all(&plain, " ");
    let result = collapse_whitespace(&strip_punctuation(&without_titles));
    if result.is_empty() {
        collapse_whitespace(&strip_punctuation(&plain))
    } else {
        result
    }
}

/// Splits a normalized name into words.
#[must_use]
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("nāropā"), "naropa");
        assert_eq!(strip_diacritics("śāntarakṣita"), "shantarakshita");
        assert_eq!(strip_diacritics("chöd"), "chod");
        assert_eq!(strip_diacritics("café"), "cafe");
    }

    #[test]
    fn test_honorifics_removed_as_whole_words() {
        assert_eq!(normalize_name("Lama Zhang"), "zhang");
        assert_eq!(normalize_name("Gyaltsab Je"), "gyaltsab");
        // "lamaist" is not the honorific "lama"
        assert_eq!(normalize_name("Lamaist texts"), "lamaist texts");
    }

    #[test]
    fn test_title_only_name_is_kept() {
        assert_eq!(normalize_name("Lama"), "lama");
        assert_eq!(normalize_name("Je Rinpoche"), "je rinpoche");
    }

    #[test]
    fn test_punctuation_and_separators() {
        assert_eq!(normalize_name("Mar-pa"), "mar pa");
        assert_eq!(normalize_name("mi_la ras-pa"), "mi la ras pa");
        assert_eq!(normalize_name("'brug pa"), "brug pa");
        assert_eq!(normalize_name("Tsongkhapa (Lobsang Drakpa)"), "tsongkhapa lobsang drakpa");
    }

    #[test]
    fn test_tibetan_script_tsheg_splits_syllables() {
        assert_eq!(normalize_name("མར་པ"), "མར པ");
        // vowel signs are combining marks but not diacritics
        assert_eq!(normalize_name("མི་ལ"), "མི ལ");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" -- "), "");
    }
}
