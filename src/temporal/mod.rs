//! Historical dates: canonical representation, Tibetan calendar arithmetic and
//! the date-expression resolver that feeds the duplicate detector's date signal.

pub mod calendar;
pub mod date;
pub mod resolver;

pub use calendar::{convert_tibetan_to_gregorian, EraRange};
pub use date::{Animal, DateInfo, DatePrecision, Element, Season, TibetanYear};
pub use resolver::{DateContext, KnownDates, TemporalResolver};
