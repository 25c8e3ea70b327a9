//! Tibetan calendar arithmetic and the historical era table.
//!
//! Rabjung 1 begins in 1027 CE (a fire-rabbit year). Each rabjung is sixty
//! years long; every year carries one of sixty element-animal labels, the same
//! sexagenary cycle used in the Chinese calendar.

use serde::{Deserialize, Serialize};

use crate::error::{InvalidDateError, RangeError, ResolveError};
use crate::temporal::date::{Animal, DatePrecision, Element, TibetanYear};

/// First Gregorian year of rabjung 1.
pub const RABJUNG_EPOCH: i32 = 1027;

/// Years per rabjung.
pub const CYCLE_LENGTH: i32 = 60;

/// Highest rabjung number accepted.
pub const MAX_RABJUNG: i32 = 17;

/// Converts a rabjung cycle year to a Gregorian year.
///
/// `year = 1027 + (rabjung - 1) * 60 + (year_in_rabjung - 1)`. If an element
/// and animal are supplied they must agree with the computed year.
///
/// # Errors
///
/// - `RangeError::Rabjung` if `rabjung` is outside [1, 17]
/// - `RangeError::YearInRabjung` if `year_in_rabjung` is outside [1, 60]
/// - `InvalidDateError::ImpossibleCombination` if the element/animal disagree
///
/// # Examples
///
/// ```
/// use lotsawa::temporal::convert_tibetan_to_gregorian;
///
/// assert_eq!(convert_tibetan_to_gregorian(1, 1, None, None).unwrap(), 1027);
/// assert_eq!(convert_tibetan_to_gregorian(14, 30, None, None).unwrap(), 1836);
/// ```
pub fn convert_tibetan_to_gregorian(
    rabjung: i32,
    year_in_rabjung: i32,
    element: Option<Element>,
    animal: Option<Animal>,
) -> Result<i32, ResolveError> {
    if !(1..=MAX_RABJUNG).contains(&rabjung) {
        return Err(RangeError::Rabjung { value: rabjung }.into());
    }
    if !(1..=CYCLE_LENGTH).contains(&year_in_rabjung) {
        return Err(RangeError::YearInRabjung {
            value: year_in_rabjung,
        }
        .into());
    }

    let year = RABJUNG_EPOCH + (rabjung - 1) * CYCLE_LENGTH + (year_in_rabjung - 1);

    let element_ok = element.map_or(true, |e| element_of(year) == e);
    let animal_ok = animal.map_or(true, |a| animal_of(year) == a);
    if !(element_ok && animal_ok) {
        return Err(InvalidDateError::ImpossibleCombination {
            element: element.map_or_else(|| element_of(year).to_string(), |e| e.to_string()),
            animal: animal.map_or_else(|| animal_of(year).to_string(), |a| a.to_string()),
        }
        .into());
    }

    Ok(year)
}

/// Element of a Gregorian year.
#[must_use]
pub fn element_of(year: i32) -> Element {
    let stem = (year - 4).rem_euclid(10);
    Element::ALL[(stem / 2) as usize]
}

/// Animal of a Gregorian year.
#[must_use]
pub fn animal_of(year: i32) -> Animal {
    Animal::ALL[(year - 4).rem_euclid(12) as usize]
}

/// Position (1..=60) of an element-animal pair within a rabjung.
///
/// Each of the 60 pairs occurs exactly once per cycle: the element's two
/// stems take opposite parities, and the animal fixes which one applies.
#[must_use]
pub fn year_in_rabjung_of(element: Element, animal: Animal) -> i32 {
    let branch = animal.index();
    let stem = element.index() * 2 + branch % 2;
    // Offset from a wood-mouse year: k ≡ stem (mod 10), k ≡ branch (mod 12).
    let k = (6 * stem - 5 * branch).rem_euclid(CYCLE_LENGTH);
    (4 + k - RABJUNG_EPOCH).rem_euclid(CYCLE_LENGTH) + 1
}

/// Tibetan cycle year for a Gregorian year, if it falls inside rabjung 1..=17.
#[must_use]
pub fn tibetan_year_of(year: i32) -> Option<TibetanYear> {
    let offset = year - RABJUNG_EPOCH;
    if offset < 0 {
        return None;
    }
    let rabjung = offset / CYCLE_LENGTH + 1;
    if rabjung > MAX_RABJUNG {
        return None;
    }
    let in_cycle = offset % CYCLE_LENGTH + 1;
    Some(TibetanYear {
        rabjung: u8::try_from(rabjung).ok()?,
        year: u8::try_from(in_cycle).ok()?,
        element: element_of(year),
        animal: animal_of(year),
    })
}

/// The occurrence of an element-animal pair nearest to `context_year`.
///
/// Ties resolve to the earlier occurrence.
#[must_use]
pub fn nearest_occurrence(element: Element, animal: Animal, context_year: i32) -> i64 {
    let context_year = i64::from(context_year);
    let cycle = i64::from(CYCLE_LENGTH);
    let anchor = i64::from(RABJUNG_EPOCH + year_in_rabjung_of(element, animal) - 1);
    let before = anchor + (context_year - anchor).div_euclid(cycle) * cycle;
    let after = before + cycle;
    if context_year - before <= after - context_year {
        before
    } else {
        after
    }
}

/// Year range of a named historical era.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraRange {
    /// Canonical era name.
    pub name: String,
    pub start: i32,
    pub end: i32,
    pub precision: DatePrecision,
    pub confidence: f64,
}

impl EraRange {
    /// Middle year of the range.
    #[must_use]
    pub const fn midpoint(&self) -> i32 {
        self.start + (self.end - self.start) / 2
    }

    /// Narrows the range to its first third.
    #[must_use]
    pub fn early(&self) -> Self {
        let third = (self.end - self.start) / 3;
        Self {
            end: self.start + third,
            ..self.clone()
        }
    }

    /// Narrows the range to its middle third.
    #[must_use]
    pub fn middle(&self) -> Self {
        let third = (self.end - self.start) / 3;
        Self {
            start: self.start + third,
            end: self.end - third,
            ..self.clone()
        }
    }

    /// Narrows the range to its last third.
    #[must_use]
    pub fn late(&self) -> Self {
        let third = (self.end - self.start) / 3;
        Self {
            start: self.end - third,
            ..self.clone()
        }
    }
}

struct Era {
    names: &'static [&'static str],
    start: i32,
    end: i32,
    confidence: f64,
}

const ERAS: &[Era] = &[
    Era {
        names: &[
            "imperial period",
            "tibetan empire",
            "yarlung dynasty",
            "early diffusion",
            "first diffusion",
        ],
        start: 618,
        end: 842,
        confidence: 0.85,
    },
    Era {
        names: &["era of fragmentation", "period of fragmentation", "dark age"],
        start: 842,
        end: 978,
        confidence: 0.8,
    },
    Era {
        names: &["later diffusion", "second diffusion", "chidar", "phyi dar"],
        start: 978,
        end: 1204,
        confidence: 0.7,
    },
    Era {
        names: &["sakya period", "sakya hegemony", "sakya administration"],
        start: 1264,
        end: 1354,
        confidence: 0.9,
    },
    Era {
        names: &["phagmodrupa period", "phagmodru dynasty"],
        start: 1354,
        end: 1435,
        confidence: 0.85,
    },
    Era {
        names: &["rinpungpa period", "rinpung dynasty"],
        start: 1435,
        end: 1565,
        confidence: 0.8,
    },
    Era {
        names: &["tsangpa period", "tsangpa dynasty"],
        start: 1565,
        end: 1642,
        confidence: 0.85,
    },
    Era {
        names: &["ganden phodrang", "ganden phodrang period"],
        start: 1642,
        end: 1959,
        confidence: 0.9,
    },
    Era {
        names: &["pala empire", "pala period"],
        start: 750,
        end: 1174,
        confidence: 0.8,
    },
    Era {
        names: &["yuan dynasty"],
        start: 1271,
        end: 1368,
        confidence: 0.95,
    },
    Era {
        names: &["ming dynasty"],
        start: 1368,
        end: 1644,
        confidence: 0.95,
    },
    Era {
        names: &["qing dynasty"],
        start: 1644,
        end: 1912,
        confidence: 0.95,
    },
];

/// Looks up an era by name (case-insensitive, leading "the" ignored).
#[must_use]
pub fn lookup_era(name: &str) -> Option<EraRange> {
    let key = name.trim().to_lowercase();
    let key = key.strip_prefix("the ").unwrap_or(&key).trim();
    ERAS.iter()
        .find(|era| era.names.iter().any(|n| *n == key))
        .map(|era| EraRange {
            name: era.names[0].to_string(),
            start: era.start,
            end: era.end,
            precision: DatePrecision::Estimated,
            confidence: era.confidence,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_anchor_points() {
        assert_eq!(convert_tibetan_to_gregorian(1, 1, None, None).unwrap(), 1027);
        assert_eq!(convert_tibetan_to_gregorian(14, 30, None, None).unwrap(), 1836);
        assert_eq!(convert_tibetan_to_gregorian(17, 60, None, None).unwrap(), 2046);
    }

    #[test]
    fn test_conversion_rejects_out_of_range() {
        assert!(convert_tibetan_to_gregorian(0, 1, None, None).unwrap_err().is_range());
        assert!(convert_tibetan_to_gregorian(18, 1, None, None).unwrap_err().is_range());
        assert!(convert_tibetan_to_gregorian(5, 0, None, None).unwrap_err().is_range());
        assert!(convert_tibetan_to_gregorian(5, 61, None, None).unwrap_err().is_range());
    }

    #[test]
    fn test_conversion_checks_element_animal() {
        let year = convert_tibetan_to_gregorian(1, 1, Some(Element::Fire), Some(Animal::Rabbit));
        assert_eq!(year.unwrap(), 1027);
        let wrong = convert_tibetan_to_gregorian(1, 1, Some(Element::Water), None);
        assert!(wrong.unwrap_err().is_invalid_date());
    }

    #[test]
    fn test_cycle_labels() {
        assert_eq!(element_of(1027), Element::Fire);
        assert_eq!(animal_of(1027), Animal::Rabbit);
        assert_eq!(element_of(1856), Element::Fire);
        assert_eq!(animal_of(1856), Animal::Dragon);
        assert_eq!(element_of(1028), Element::Earth);
        assert_eq!(animal_of(1028), Animal::Dragon);
    }

    #[test]
    fn test_every_label_occurs_once_per_cycle() {
        let mut seen = std::collections::HashSet::new();
        for offset in 0..CYCLE_LENGTH {
            let year = RABJUNG_EPOCH + offset;
            assert!(seen.insert((element_of(year), animal_of(year))));
        }
        assert_eq!(seen.len(), 60);
        for element in Element::ALL {
            for animal in Animal::ALL {
                let position = year_in_rabjung_of(element, animal);
                let year = RABJUNG_EPOCH + position - 1;
                assert_eq!((element_of(year), animal_of(year)), (element, animal));
            }
        }
        assert_eq!(year_in_rabjung_of(Element::Fire, Animal::Rabbit), 1);
        assert_eq!(year_in_rabjung_of(Element::Wood, Animal::Ox), 59);
        assert_eq!(year_in_rabjung_of(Element::Fire, Animal::Dragon), 50);
    }

    #[test]
    fn test_tibetan_year_of_roundtrips_gregorian() {
        let t = tibetan_year_of(1856).unwrap();
        assert_eq!(t.rabjung, 14);
        assert_eq!(t.year, 50);
        assert_eq!(t.gregorian(), 1856);
        assert!(tibetan_year_of(1000).is_none());
        assert!(tibetan_year_of(2047).is_none());
    }

    #[test]
    fn test_nearest_occurrence() {
        // Fire-dragon years: 1076, 1136, 1196, ...
        assert_eq!(nearest_occurrence(Element::Fire, Animal::Dragon, 1100), 1076);
        assert_eq!(nearest_occurrence(Element::Fire, Animal::Dragon, 1120), 1136);
        assert_eq!(nearest_occurrence(Element::Fire, Animal::Dragon, 1856), 1856);
    }

    #[test]
    fn test_era_lookup_and_modifiers() {
        let sakya = lookup_era("The Sakya period").unwrap();
        assert_eq!((sakya.start, sakya.end), (1264, 1354));
        assert_eq!(sakya.early().end, 1294);
        assert_eq!(sakya.late().start, 1324);
        assert!(lookup_era("age of aquarius").is_none());
    }
}
