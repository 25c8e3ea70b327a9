//! Canonical date representation.
//!
//! Historical sources rarely give a clean Gregorian year. A [`DateInfo`] keeps
//! whatever was recoverable (a year, a Tibetan cycle year, an era, a relative
//! phrase) together with how precise and how trustworthy it is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::temporal::calendar;

/// How precisely a date is known, from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    /// The source states the year outright.
    Exact,
    /// Within a few years.
    Circa,
    /// Derived from a range or heuristic.
    Estimated,
    /// Sources disagree.
    Disputed,
    /// Nothing usable.
    Unknown,
}

impl DatePrecision {
    /// Ordering rank: `exact > circa > estimated > disputed > unknown`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Exact => 4,
            Self::Circa => 3,
            Self::Estimated => 2,
            Self::Disputed => 1,
            Self::Unknown => 0,
        }
    }

    /// Returns true for `exact` and `circa`.
    #[must_use]
    pub const fn is_at_least_circa(self) -> bool {
        self.rank() >= Self::Circa.rank()
    }
}

impl Default for DatePrecision {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Circa => write!(f, "circa"),
            Self::Estimated => write!(f, "estimated"),
            Self::Disputed => write!(f, "disputed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The five elements of the sixty-year cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Wood,
    Fire,
    Earth,
    /// Also called metal.
    Iron,
    Water,
}

impl Element {
    /// All elements in cycle order.
    pub const ALL: [Self; 5] = [Self::Wood, Self::Fire, Self::Earth, Self::Iron, Self::Water];

    /// Position in [`Element::ALL`].
    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wood" => Ok(Self::Wood),
            "fire" => Ok(Self::Fire),
            "earth" => Ok(Self::Earth),
            "iron" | "metal" => Ok(Self::Iron),
            "water" => Ok(Self::Water),
            other => Err(format!("unknown element: {other}")),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wood => "wood",
            Self::Fire => "fire",
            Self::Earth => "earth",
            Self::Iron => "iron",
            Self::Water => "water",
        };
        f.write_str(s)
    }
}

/// The twelve animals of the sixty-year cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Animal {
    Mouse,
    Ox,
    Tiger,
    Rabbit,
    Dragon,
    Snake,
    Horse,
    Sheep,
    Monkey,
    Bird,
    Dog,
    Pig,
}

impl Animal {
    /// All animals in cycle order, starting from the mouse.
    pub const ALL: [Self; 12] = [
        Self::Mouse,
        Self::Ox,
        Self::Tiger,
        Self::Rabbit,
        Self::Dragon,
        Self::Snake,
        Self::Horse,
        Self::Sheep,
        Self::Monkey,
        Self::Bird,
        Self::Dog,
        Self::Pig,
    ];

    /// Position in [`Animal::ALL`].
    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }

    /// Male years fall on even positions (mouse, tiger, dragon, horse,
    /// monkey, dog); the rest are female.
    #[must_use]
    pub const fn is_male(self) -> bool {
        self.index() % 2 == 0
    }
}

impl FromStr for Animal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mouse" | "rat" => Ok(Self::Mouse),
            "ox" | "cow" => Ok(Self::Ox),
            "tiger" => Ok(Self::Tiger),
            "rabbit" | "hare" => Ok(Self::Rabbit),
            "dragon" => Ok(Self::Dragon),
            "snake" => Ok(Self::Snake),
            "horse" => Ok(Self::Horse),
            "sheep" | "goat" => Ok(Self::Sheep),
            "monkey" => Ok(Self::Monkey),
            "bird" | "rooster" | "hen" => Ok(Self::Bird),
            "dog" => Ok(Self::Dog),
            "pig" | "boar" => Ok(Self::Pig),
            other => Err(format!("unknown animal: {other}")),
        }
    }
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mouse => "mouse",
            Self::Ox => "ox",
            Self::Tiger => "tiger",
            Self::Rabbit => "rabbit",
            Self::Dragon => "dragon",
            Self::Snake => "snake",
            Self::Horse => "horse",
            Self::Sheep => "sheep",
            Self::Monkey => "monkey",
            Self::Bird => "bird",
            Self::Dog => "dog",
            Self::Pig => "pig",
        };
        f.write_str(s)
    }
}

/// A year expressed in the Tibetan rabjung system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TibetanYear {
    /// Sixty-year cycle number, 1..=17.
    pub rabjung: u8,
    /// Year within the cycle, 1..=60.
    pub year: u8,
    pub element: Element,
    pub animal: Animal,
}

impl TibetanYear {
    /// Returns true if `rabjung` and `year` are within their domains.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (1..=calendar::MAX_RABJUNG).contains(&i32::from(self.rabjung))
            && (1..=calendar::CYCLE_LENGTH).contains(&i32::from(self.year))
    }

    /// Gregorian year of this cycle year.
    #[must_use]
    pub fn gregorian(&self) -> i32 {
        calendar::RABJUNG_EPOCH
            + (i32::from(self.rabjung) - 1) * calendar::CYCLE_LENGTH
            + (i32::from(self.year) - 1)
    }
}

impl fmt::Display for TibetanYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} (year {} of rabjung {})",
            self.element, self.animal, self.year, self.rabjung
        )
    }
}

/// Season named in a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "autumn" | "fall" => Ok(Self::Autumn),
            "winter" => Ok(Self::Winter),
            other => Err(format!("unknown season: {other}")),
        }
    }
}

/// Canonical date record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DateInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tibetan_year: Option<TibetanYear>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,

    /// Original relative phrase, e.g. "after Marpa died".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,

    #[serde(default)]
    pub precision: DatePrecision,

    #[serde(default)]
    pub confidence: Confidence,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DateInfo {
    /// A year stated outright.
    #[must_use]
    pub fn exact(year: i32) -> Self {
        Self {
            year: Some(year),
            precision: DatePrecision::Exact,
            confidence: Confidence::one(),
            ..Self::default()
        }
    }

    /// An approximate year.
    #[must_use]
    pub fn circa(year: i32) -> Self {
        Self {
            year: Some(year),
            precision: DatePrecision::Circa,
            confidence: Confidence::clamped(0.8),
            ..Self::default()
        }
    }

    /// A derived estimate.
    #[must_use]
    pub fn estimated(year: i32) -> Self {
        Self {
            year: Some(year),
            precision: DatePrecision::Estimated,
            confidence: Confidence::neutral(),
            ..Self::default()
        }
    }

    /// A date nobody could pin down.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            confidence: Confidence::zero(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: DatePrecision) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Gregorian year, falling back to the Tibetan cycle year.
    #[must_use]
    pub fn effective_year(&self) -> Option<i32> {
        self.year
            .or_else(|| self.tibetan_year.filter(TibetanYear::is_valid).map(|t| t.gregorian()))
    }

    /// Returns true if a year can be derived.
    #[must_use]
    pub fn is_dated(&self) -> bool {
        self.effective_year().is_some()
    }

    /// Checks the Tibetan-year invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.tibetan_year.map_or(true, |t| t.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_ranking() {
        assert!(DatePrecision::Exact.rank() > DatePrecision::Circa.rank());
        assert!(DatePrecision::Circa.rank() > DatePrecision::Estimated.rank());
        assert!(DatePrecision::Estimated.rank() > DatePrecision::Disputed.rank());
        assert!(DatePrecision::Disputed.rank() > DatePrecision::Unknown.rank());
        assert!(DatePrecision::Circa.is_at_least_circa());
        assert!(!DatePrecision::Estimated.is_at_least_circa());
    }

    #[test]
    fn test_element_animal_aliases() {
        assert_eq!("metal".parse::<Element>().unwrap(), Element::Iron);
        assert_eq!("Hare".parse::<Animal>().unwrap(), Animal::Rabbit);
        assert_eq!("rooster".parse::<Animal>().unwrap(), Animal::Bird);
        assert!("stone".parse::<Element>().is_err());
    }

    #[test]
    fn test_effective_year_prefers_gregorian() {
        let mut date = DateInfo::exact(1040);
        date.tibetan_year = Some(TibetanYear {
            rabjung: 1,
            year: 1,
            element: Element::Fire,
            animal: Animal::Rabbit,
        });
        assert_eq!(date.effective_year(), Some(1040));

        date.year = None;
        assert_eq!(date.effective_year(), Some(1027));
    }

    #[test]
    fn test_invalid_tibetan_year_is_not_dated() {
        let date = DateInfo {
            tibetan_year: Some(TibetanYear {
                rabjung: 18,
                year: 1,
                element: Element::Fire,
                animal: Animal::Rabbit,
            }),
            ..DateInfo::default()
        };
        assert!(!date.is_valid());
        assert!(!date.is_dated());
    }

    #[test]
    fn test_date_info_serde_shape() {
        let date = DateInfo::exact(1012).with_source("Blue Annals");
        let json = serde_json::to_value(&date).unwrap();
        assert_eq!(json["year"], 1012);
        assert_eq!(json["precision"], "exact");
        assert!(json.get("era").is_none());
        let back: DateInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, date);
    }
}
