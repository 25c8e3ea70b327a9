//! Name variants keyed by script.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Writing system or romanization a name is recorded in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Script {
    Tibetan,
    English,
    Phonetic,
    Wylie,
    Sanskrit,
    Chinese,
    Mongolian,
    /// Any script without a dedicated variant, stored lowercase.
    Other(String),
}

impl From<String> for Script {
    fn from(value: String) -> Self {
        let key = value.trim().to_lowercase();
        match key.as_str() {
            "tibetan" | "bo" => Self::Tibetan,
            "english" | "en" => Self::English,
            "phonetic" => Self::Phonetic,
            "wylie" => Self::Wylie,
            "sanskrit" | "sa" => Self::Sanskrit,
            "chinese" | "zh" => Self::Chinese,
            "mongolian" | "mn" => Self::Mongolian,
            _ => Self::Other(key),
        }
    }
}

impl From<&str> for Script {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Script> for String {
    fn from(value: Script) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tibetan => write!(f, "tibetan"),
            Self::English => write!(f, "english"),
            Self::Phonetic => write!(f, "phonetic"),
            Self::Wylie => write!(f, "wylie"),
            Self::Sanskrit => write!(f, "sanskrit"),
            Self::Chinese => write!(f, "chinese"),
            Self::Mongolian => write!(f, "mongolian"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Alternative names of an entity, grouped by script.
///
/// Within a script names are unique (exact string comparison) and keep
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameVariants(BTreeMap<Script, Vec<String>>);

impl NameVariants {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name under `script`. Returns false if it was already present or blank.
    pub fn add(&mut self, script: Script, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            return false;
        }
        let names = self.0.entry(script).or_default();
        if names.contains(&name) {
            return false;
        }
        names.push(name);
        true
    }

    /// Names recorded for one script.
    #[must_use]
    pub fn get(&self, script: &Script) -> &[String] {
        self.0.get(script).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, script: &Script, name: &str) -> bool {
        self.get(script).iter().any(|n| n == name)
    }

    /// Iterates `(script, names)` in script order.
    pub fn iter(&self) -> impl Iterator<Item = (&Script, &[String])> {
        self.0.iter().map(|(s, names)| (s, names.as_slice()))
    }

    /// Every name across all scripts.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.values().flatten().map(String::as_str)
    }

    /// Total number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union per script, keeping this side's order first.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (script, names) in other.iter() {
            for name in names {
                merged.add(script.clone(), name.clone());
            }
        }
        merged.0.retain(|_, names| !names.is_empty());
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_parsing() {
        assert_eq!(Script::from("Wylie"), Script::Wylie);
        assert_eq!(Script::from("bo"), Script::Tibetan);
        assert_eq!(Script::from("Pali"), Script::Other("pali".to_string()));
    }

    #[test]
    fn test_script_serde_is_string() {
        let json = serde_json::to_value(Script::Sanskrit).unwrap();
        assert_eq!(json, serde_json::json!("sanskrit"));
        let parsed: Script = serde_json::from_str("\"pali\"").unwrap();
        assert_eq!(parsed, Script::Other("pali".to_string()));
    }

    #[test]
    fn test_add_deduplicates() {
        let mut v = NameVariants::new();
        assert!(v.add(Script::English, "Marpa"));
        assert!(!v.add(Script::English, "Marpa"));
        assert!(!v.add(Script::English, "  "));
        assert!(v.add(Script::Wylie, "mar pa"));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_union_is_duplicate_free_and_primary_first() {
        let mut a = NameVariants::new();
        a.add(Script::English, "Marpa");
        let mut b = NameVariants::new();
        b.add(Script::English, "Marpa");
        b.add(Script::English, "Marpa the Translator");
        b.add(Script::Tibetan, "མར་པ");

        let merged = a.union(&b);
        assert_eq!(merged.get(&Script::English), ["Marpa", "Marpa the Translator"]);
        assert_eq!(merged.get(&Script::Tibetan), ["མར་པ"]);
        assert_eq!(merged.union(&b), merged);
    }

    #[test]
    fn test_serialized_as_map() {
        let mut v = NameVariants::new();
        v.add(Script::English, "Naropa");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({"english": ["Naropa"]}));
    }
}
