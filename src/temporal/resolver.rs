//! Date-expression resolution.
//!
//! Expressions are tried in a fixed order and the first recogniser that
//! matches wins:
//!
//! 1. Gregorian years (`1012`, `1097 CE`, `AD 1050`)
//! 2. Rabjung expressions (`fire-dragon year of the 14th rabjung`, `14th rabjung`)
//! 3. Bare element-animal years (`iron-tiger year`)
//! 4. Relative expressions (`after Marpa died`, `3 years before Milarepa was born`, `at age 45`)
//! 5. Era names (`early Sakya period`)
//! 6. Seasons and centuries (`spring of 1050`, `mid 11th century`)

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use tracing::debug;

use crate::confidence::Confidence;
use crate::entity::Entity;
use crate::error::{InvalidDateError, NotFoundError, RangeError, ResolveError, ValidationError};
use crate::fuzzy::normalize_name;
use crate::temporal::calendar::{self, EraRange};
use crate::temporal::date::{Animal, DateInfo, DatePrecision, Element, Season};
use crate::TARGET_TEMPORAL;

/// Earliest Gregorian year accepted.
pub const MIN_HISTORICAL_YEAR: i32 = 1;

/// Latest century accepted in century expressions.
const MAX_CENTURY: i32 = 21;

const RABJUNG_FULL_CONFIDENCE: f64 = 0.9;
const RABJUNG_ONLY_CONFIDENCE: f64 = 0.5;
const CYCLE_WITH_CONTEXT_CONFIDENCE: f64 = 0.7;
const CYCLE_DEFAULT_CONFIDENCE: f64 = 0.3;
const SEASON_CONFIDENCE: f64 = 0.95;
const CENTURY_CONFIDENCE: f64 = 0.6;
const BARE_CENTURY_CONFIDENCE: f64 = 0.5;

/// Birth and death dates of an entity that relative expressions may cite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownDates {
    pub birth: Option<DateInfo>,
    pub death: Option<DateInfo>,
}

/// Context for resolving relative and cycle-only expressions.
#[derive(Debug, Clone, Default)]
pub struct DateContext {
    /// Year near which ambiguous cycle years should land.
    pub context_year: Option<i32>,
    /// Name of the entity the date belongs to (used by "at age N").
    pub subject: Option<String>,
    known: HashMap<String, KnownDates>,
}

impl DateContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_context_year(mut self, year: i32) -> Self {
        self.context_year = Some(year);
        self
    }

    #[must_use]
    pub fn with_subject(mut self, name: impl Into<String>) -> Self {
        self.subject = Some(name.into());
        self
    }

    /// Registers birth/death dates under a name.
    #[must_use]
    pub fn with_known(mut self, name: &str, dates: KnownDates) -> Self {
        self.known.insert(normalize_name(name), dates);
        self
    }

    /// Registers an entity's `birth`/`death` dates under every name it carries.
    #[must_use]
    pub fn with_entity(mut self, entity: &Entity) -> Self {
        let dates = KnownDates {
            birth: entity.dates.get("birth").cloned(),
            death: entity.dates.get("death").cloned(),
        };
        for name in entity.all_names() {
            let key = normalize_name(name);
            if !key.is_empty() {
                self.known.insert(key, dates.clone());
            }
        }
        self
    }

    fn lookup(&self, name: &str) -> Option<&KnownDates> {
        self.known.get(&normalize_name(name))
    }
}

struct Patterns {
    gregorian: Regex,
    gregorian_prefixed: Regex,
    rabjung_number: Regex,
    cycle_label: Regex,
    year_of_rabjung: Regex,
    offset_relative: Regex,
    bare_relative: Regex,
    death_of: Regex,
    subject_age: Regex,
    named_age: Regex,
    era_modifier: Regex,
    season: Regex,
    century: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile =
            |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("invalid built-in pattern {p}: {e}"));
        Patterns {
            gregorian: compile(r"^(\d+)\s*(?:ce|c\.e\.?|ad|a\.d\.?)?$"),
            gregorian_prefixed: compile(r"^(?:ad|a\.d\.?)\s*(\d+)$"),
            rabjung_number: compile(
                r"(?:(\d{1,3})(?:st|nd|rd|th)?\s+rabjung|rabjung\s+(?:no\.?\s*)?(\d{1,3}))",
            ),
            cycle_label: compile(concat!(
                r"\b(wood|fire|earth|iron|metal|water)(?:[\s-]+(male|female))?[\s-]+",
                r"(mouse|rat|ox|cow|tiger|rabbit|hare|dragon|snake|horse|sheep|goat|monkey|bird|",
                r"rooster|hen|dog|pig|boar)\b",
            )),
            year_of_rabjung: compile(r"^(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)\s+year\s+of\s+"),
            offset_relative: compile(
                r"^(\d+)\s+years?\s+(after|before)\s+(.+?)\s+(died|passed away|was born)$",
            ),
            bare_relative: compile(
                r"^(?:shortly\s+)?(after|before)\s+(.+?)\s+(died|passed away|was born)$",
            ),
            death_of: compile(r"^(?:shortly\s+)?(after|before)\s+the\s+(death|birth)\s+of\s+(.+)$"),
            subject_age: compile(r"^at\s+(?:the\s+)?age\s+(?:of\s+)?(\d+)$"),
            named_age: compile(concat!(
                r"^(?:when\s+)?(.+?)\s+(?:was|at\s+(?:the\s+)?age(?:\s+of)?)\s+",
                r"(\d+)(?:\s+years\s+old)?$",
            )),
            era_modifier: compile(r"^(early|mid|middle|late)\s+(.+)$"),
            season: compile(concat!(
                r"^(?:the\s+)?(spring|summer|autumn|fall|winter)\s+",
                r"(?:of\s+)?(\d+)(?:\s*(?:ce|ad))?$",
            )),
            century: compile(concat!(
                r"^(?:(early|mid|middle|late)[\s-]+)?(?:the\s+)?(\d{1,3})(?:st|nd|rd|th)[\s-]+",
                r"century(?:\s*(?:ce|ad))?$",
            )),
        }
    })
}

/// Which event of a referenced entity a relative expression anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Birth,
    Death,
}

impl Anchor {
    fn from_verb(verb: &str) -> Self {
        if verb == "was born" || verb == "birth" {
            Self::Birth
        } else {
            Self::Death
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Death => "death",
        }
    }
}

/// Parses heterogeneous date expressions into [`DateInfo`].
///
/// # Examples
///
/// ```
/// use lotsawa::temporal::{DatePrecision, TemporalResolver};
///
/// let resolver = TemporalResolver::new();
/// let date = resolver.resolve_date("fire-dragon year of the 14th rabjung", None).unwrap();
/// assert_eq!(date.year, Some(1856));
/// assert_eq!(date.precision, DatePrecision::Exact);
/// ```
#[derive(Debug, Clone)]
pub struct TemporalResolver {
    min_year: i32,
    max_year: i32,
}

impl Default for TemporalResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalResolver {
    /// Creates a resolver accepting years from 1 CE to the current year.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_year: MIN_HISTORICAL_YEAR,
            max_year: Utc::now().year(),
        }
    }

    /// Creates a resolver with an explicit historical range.
    #[must_use]
    pub const fn with_range(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    /// Resolves a date expression.
    ///
    /// # Errors
    ///
    /// - `InvalidDateError` for empty or unrecognised text
    /// - `RangeError` for years, rabjungs or centuries outside their domain
    /// - `NotFoundError` when a relative expression cites an unknown or dateless entity
    pub fn resolve_date(
        &self,
        text: &str,
        context: Option<&DateContext>,
    ) -> Result<DateInfo, ResolveError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(InvalidDateError::Empty.into());
        }
        let lowered = trimmed
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let lowered = lowered.trim_end_matches('.');

        let resolved = if let Some(date) = self.parse_gregorian(lowered)? {
            date
        } else if let Some(date) = self.parse_rabjung(lowered)? {
            date
        } else if let Some(date) = self.parse_cycle_label(lowered, context)? {
            date
        } else if let Some(date) = self.parse_relative(lowered, context)? {
            date
        } else if let Some(date) = self.parse_era(lowered) {
            date
        } else if let Some(date) = self.parse_natural(lowered)? {
            date
        } else {
            return Err(InvalidDateError::Unparsable {
                text: trimmed.to_string(),
            }
            .into());
        };

        debug!(
            target: TARGET_TEMPORAL,
            "Resolved '{}' to year={:?} precision={} confidence={}",
            trimmed, resolved.year, resolved.precision, resolved.confidence
        );
        Ok(resolved)
    }

    /// Converts a rabjung cycle year to a Gregorian year.
    ///
    /// # Errors
    ///
    /// See [`calendar::convert_tibetan_to_gregorian`].
    pub fn convert_tibetan_to_gregorian(
        &self,
        rabjung: i32,
        year_in_rabjung: i32,
        element: Option<Element>,
        animal: Option<Animal>,
    ) -> Result<i32, ResolveError> {
        calendar::convert_tibetan_to_gregorian(rabjung, year_in_rabjung, element, animal)
    }

    /// Looks up an era, honouring `early`/`mid`/`late` modifiers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateError::UnknownEra` if the name is not in the era table.
    pub fn resolve_era_date(&self, era_name: &str) -> Result<EraRange, ResolveError> {
        let key = era_name.trim().to_lowercase();
        if let Some(caps) = patterns().era_modifier.captures(&key) {
            if let Some(era) = calendar::lookup_era(&caps[2]) {
                return Ok(match &caps[1] {
                    "early" => era.early(),
                    "late" => era.late(),
                    _ => era.middle(),
                });
            }
        }
        calendar::lookup_era(&key).ok_or_else(|| {
            InvalidDateError::UnknownEra {
                name: era_name.trim().to_string(),
            }
            .into()
        })
    }

    /// Age at an event, in whole years.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EventBeforeBirth` if the event precedes the birth.
    pub fn calculate_age(&self, birth_year: i32, event_year: i32) -> Result<u32, ResolveError> {
        u32::try_from(i64::from(event_year) - i64::from(birth_year)).map_err(|_| {
            ValidationError::EventBeforeBirth {
                birth_year,
                event_year,
            }
            .into()
        })
    }

    fn check_year(&self, year: i64) -> Result<i32, ResolveError> {
        match i32::try_from(year) {
            Ok(y) if (self.min_year..=self.max_year).contains(&y) => Ok(y),
            _ => Err(RangeError::GregorianYear {
                value: year,
                min: self.min_year,
                max: self.max_year,
            }
            .into()),
        }
    }

    fn parse_gregorian(&self, text: &str) -> Result<Option<DateInfo>, ResolveError> {
        let p = patterns();
        let Some(caps) = p
            .gregorian
            .captures(text)
            .or_else(|| p.gregorian_prefixed.captures(text))
        else {
            return Ok(None);
        };
        let year = parse_i64(&caps[1]);
        let year = self.check_year(year)?;
        Ok(Some(DateInfo::exact(year)))
    }

    fn parse_rabjung(&self, text: &str) -> Result<Option<DateInfo>, ResolveError> {
        let p = patterns();
        let Some(caps) = p.rabjung_number.captures(text) else {
            return Ok(None);
        };
        let digits = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let rabjung = clamp_i32(parse_i64(digits));
        if !(1..=calendar::MAX_RABJUNG).contains(&rabjung) {
            return Err(RangeError::Rabjung { value: rabjung }.into());
        }

        if let Some((element, animal)) = cycle_label(text)? {
            let position = calendar::year_in_rabjung_of(element, animal);
            let year = calendar::convert_tibetan_to_gregorian(rabjung, position, None, None)?;
            return Ok(Some(self.cycle_date(year, DatePrecision::Exact, RABJUNG_FULL_CONFIDENCE)));
        }

        if let Some(pos) = p.year_of_rabjung.captures(text) {
            let position = clamp_i32(parse_i64(&pos[1]));
            let year = calendar::convert_tibetan_to_gregorian(rabjung, position, None, None)?;
            return Ok(Some(self.cycle_date(year, DatePrecision::Exact, RABJUNG_FULL_CONFIDENCE)));
        }

        let half = calendar::CYCLE_LENGTH / 2;
        let midpoint = calendar::convert_tibetan_to_gregorian(rabjung, half, None, None)?;
        let mut date = DateInfo::estimated(midpoint)
            .with_confidence(Confidence::clamped(RABJUNG_ONLY_CONFIDENCE));
        date.era = Some(format!("rabjung {rabjung}"));
        Ok(Some(date))
    }

    fn parse_cycle_label(
        &self,
        text: &str,
        context: Option<&DateContext>,
    ) -> Result<Option<DateInfo>, ResolveError> {
        let Some((element, animal)) = cycle_label(text)? else {
            return Ok(None);
        };
        match context.and_then(|c| c.context_year) {
            Some(context_year) => {
                let nearest = calendar::nearest_occurrence(element, animal, context_year);
                let year = self.check_year(nearest)?;
                Ok(Some(self.cycle_date(year, DatePrecision::Circa, CYCLE_WITH_CONTEXT_CONFIDENCE)))
            }
            None => {
                let year =
                    calendar::RABJUNG_EPOCH + calendar::year_in_rabjung_of(element, animal) - 1;
                Ok(Some(self.cycle_date(year, DatePrecision::Estimated, CYCLE_DEFAULT_CONFIDENCE)))
            }
        }
    }

    fn cycle_date(&self, year: i32, precision: DatePrecision, confidence: f64) -> DateInfo {
        DateInfo {
            year: Some(year),
            tibetan_year: calendar::tibetan_year_of(year),
            precision,
            confidence: Confidence::clamped(confidence),
            ..DateInfo::default()
        }
    }

    fn parse_relative(
        &self,
        text: &str,
        context: Option<&DateContext>,
    ) -> Result<Option<DateInfo>, ResolveError> {
        let p = patterns();

        if let Some(caps) = p.offset_relative.captures(text) {
            let offset = clamp_i32(parse_i64(&caps[1]));
            let sign = if &caps[2] == "after" { 1 } else { -1 };
            let anchor = Anchor::from_verb(&caps[4]);
            let reference = self.reference_date(context, &caps[3], anchor)?;
            return self.offset_from(text, &reference, sign * offset, 0.9).map(Some);
        }

        if let Some(caps) = p.death_of.captures(text) {
            let sign = if &caps[1] == "after" { 1 } else { -1 };
            let anchor = Anchor::from_verb(&caps[2]);
            let reference = self.reference_date(context, &caps[3], anchor)?;
            return self.bare_offset_from(text, &reference, sign).map(Some);
        }

        if let Some(caps) = p.bare_relative.captures(text) {
            let sign = if &caps[1] == "after" { 1 } else { -1 };
            let anchor = Anchor::from_verb(&caps[3]);
            let reference = self.reference_date(context, &caps[2], anchor)?;
            return self.bare_offset_from(text, &reference, sign).map(Some);
        }

        if let Some(caps) = p.subject_age.captures(text) {
            let age = clamp_i32(parse_i64(&caps[1]));
            let subject = context.and_then(|c| c.subject.clone()).ok_or_else(|| {
                ResolveError::from(NotFoundError::ReferenceEntity {
                    name: "<subject>".to_string(),
                })
            })?;
            let reference = self.reference_date(context, &subject, Anchor::Birth)?;
            return self.offset_from(text, &reference, age, 0.9).map(Some);
        }

        if let Some(caps) = p.named_age.captures(text) {
            // Only treat "<name> was N" as relative when the name is known;
            // otherwise later recognisers get a chance.
            if context.and_then(|c| c.lookup(&caps[1])).is_some() {
                let age = clamp_i32(parse_i64(&caps[2]));
                let reference = self.reference_date(context, &caps[1], Anchor::Birth)?;
                return self.offset_from(text, &reference, age, 0.9).map(Some);
            }
        }

        Ok(None)
    }

    fn reference_date(
        &self,
        context: Option<&DateContext>,
        name: &str,
        anchor: Anchor,
    ) -> Result<DateInfo, ResolveError> {
        let known = context.and_then(|c| c.lookup(name)).ok_or_else(|| {
            ResolveError::from(NotFoundError::ReferenceEntity {
                name: name.trim().to_string(),
            })
        })?;
        let date = match anchor {
            Anchor::Birth => known.birth.as_ref(),
            Anchor::Death => known.death.as_ref(),
        };
        date.filter(|d| d.is_dated()).cloned().ok_or_else(|| {
            NotFoundError::DatelessReference {
                name: name.trim().to_string(),
                event: anchor.label().to_string(),
            }
            .into()
        })
    }

    fn offset_from(
        &self,
        text: &str,
        reference: &DateInfo,
        offset: i32,
        confidence_factor: f64,
    ) -> Result<DateInfo, ResolveError> {
        let base = reference.effective_year().unwrap_or_default();
        let year = self.check_year(i64::from(base) + i64::from(offset))?;
        Ok(DateInfo {
            year: Some(year),
            relative: Some(text.to_string()),
            precision: reference.precision,
            confidence: Confidence::clamped(reference.confidence.value() * confidence_factor),
            ..DateInfo::default()
        })
    }

    fn bare_offset_from(
        &self,
        text: &str,
        reference: &DateInfo,
        sign: i32,
    ) -> Result<DateInfo, ResolveError> {
        let mut date = self.offset_from(text, reference, sign, 0.8)?;
        if date.precision.rank() > DatePrecision::Circa.rank() {
            date.precision = DatePrecision::Circa;
        }
        Ok(date)
    }

    fn parse_era(&self, text: &str) -> Option<DateInfo> {
        let era = self.resolve_era_date(text).ok()?;
        Some(DateInfo {
            year: Some(era.midpoint()),
            era: Some(era.name.clone()),
            precision: era.precision,
            confidence: Confidence::clamped(era.confidence),
            ..DateInfo::default()
        })
    }

    fn parse_natural(&self, text: &str) -> Result<Option<DateInfo>, ResolveError> {
        let p = patterns();

        if let Some(caps) = p.season.captures(text) {
            let year = self.check_year(parse_i64(&caps[2]))?;
            let mut date =
                DateInfo::exact(year).with_confidence(Confidence::clamped(SEASON_CONFIDENCE));
            date.season = caps[1].parse::<Season>().ok();
            return Ok(Some(date));
        }

        if let Some(caps) = p.century.captures(text) {
            let century = parse_i64(&caps[2]);
            if !(1..=i64::from(MAX_CENTURY)).contains(&century) {
                return Err(RangeError::Century {
                    value: century,
                    max: MAX_CENTURY,
                }
                .into());
            }
            let (offset, confidence) = match caps.get(1).map(|m| m.as_str()) {
                Some("early") => (20, CENTURY_CONFIDENCE),
                Some("late") => (80, CENTURY_CONFIDENCE),
                Some(_) => (50, CENTURY_CONFIDENCE),
                None => (50, BARE_CENTURY_CONFIDENCE),
            };
            let year = self.check_year((century - 1) * 100 + offset)?;
            return Ok(Some(
                DateInfo::estimated(year).with_confidence(Confidence::clamped(confidence)),
            ));
        }

        Ok(None)
    }
}

fn cycle_label(text: &str) -> Result<Option<(Element, Animal)>, ResolveError> {
    let Some(caps) = patterns().cycle_label.captures(text) else {
        return Ok(None);
    };
    let unparsable = || {
        ResolveError::from(InvalidDateError::Unparsable {
            text: text.to_string(),
        })
    };
    let element = caps[1].parse::<Element>().map_err(|_| unparsable())?;
    let animal = caps[3].parse::<Animal>().map_err(|_| unparsable())?;
    if let Some(gender) = caps.get(2) {
        if (gender.as_str() == "male") != animal.is_male() {
            return Err(InvalidDateError::ImpossibleCombination {
                element: element.to_string(),
                animal: format!("{} {animal}", gender.as_str()),
            }
            .into());
        }
    }
    Ok(Some((element, animal)))
}

/// Parses a digit run, saturating instead of overflowing.
fn parse_i64(digits: &str) -> i64 {
    digits.parse::<i64>().unwrap_or(i64::MAX)
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
