//! American Soundex over the ASCII letters of a word.

use std::collections::BTreeSet;

fn digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// Four-character Soundex code, or `None` if the word has no ASCII letters.
///
/// Adjacent letters with the same code collapse; `h` and `w` do not separate
/// them, vowels do.
///
/// # Examples
///
/// ```
/// use lotsawa::fuzzy::soundex;
///
/// assert_eq!(soundex("robert").as_deref(), Some("R163"));
/// assert_eq!(soundex("rupert").as_deref(), Some("R163"));
/// assert_eq!(soundex("ཀ"), None);
/// ```
#[must_use]
pub fn soundex(word: &str) -> Option<String> {
    let mut letters = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase());
    let first = letters.next()?;

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut last = digit(first);

    for c in letters {
        match digit(c) {
            Some(d) => {
                if last != Some(d) {
                    code.push(d);
                    if code.len() == 4 {
                        break;
                    }
                }
                last = Some(d);
            }
            None if c == 'h' || c == 'w' => {}
            None => last = None,
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

/// Fraction of shared Soundex codes between two word lists.
///
/// `|codes(a) ∩ codes(b)| / max(|codes(a)|, |codes(b)|)`; 0.0 when either side
/// yields no codes.
#[must_use]
pub fn phonetic_similarity(a: &[&str], b: &[&str]) -> f64 {
    let codes_a: BTreeSet<String> = a.iter().filter_map(|w| soundex(w)).collect();
    let codes_b: BTreeSet<String> = b.iter().filter_map(|w| soundex(w)).collect();
    let denominator = codes_a.len().max(codes_b.len());
    if codes_a.is_empty() || codes_b.is_empty() {
        return 0.0;
    }
    let shared = codes_a.intersection(&codes_b).count();
    shared as f64 / denominator as f64
}
