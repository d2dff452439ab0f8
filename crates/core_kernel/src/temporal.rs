//! Time handling for validity windows and age calculation
//!
//! The school operates in a single local timezone. "Today" for age-based
//! tax exemption is evaluated in that zone, while validity windows on
//! rules and codes are stored and compared as UTC instants.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the school's jurisdiction
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name such as `America/Vancouver`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Returns the calendar date in this timezone at the given instant
    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Returns today's calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::America::Vancouver)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must not be after end {end}")]
    InvalidWindow {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// A validity window where either bound may be open
///
/// Both bounds are inclusive: an instant equal to `until` is still inside
/// the window. A missing bound is unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// Creates a window, rejecting one whose start is after its end
    pub fn new(
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Self, TemporalError> {
        if let (Some(start), Some(end)) = (from, until) {
            if start > end {
                return Err(TemporalError::InvalidWindow {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(Self { from, until })
    }

    /// A window with no bounds at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A window starting at `from` with no end
    pub fn starting(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: None,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |f| instant >= f) && self.until.map_or(true, |u| instant <= u)
    }

    /// True when the window has not opened yet at `instant`
    pub fn is_pending_at(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(false, |f| instant < f)
    }

    /// True when the window has closed at `instant`
    pub fn is_expired_at(&self, instant: DateTime<Utc>) -> bool {
        self.until.map_or(false, |u| instant > u)
    }
}

/// Completed years of age on `today` for someone born on `birth_date`
///
/// The year difference is reduced by one when the birthday has not yet
/// been reached this year.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on_birthday() {
        assert_eq!(age_on(date(2010, 6, 15), date(2025, 6, 15)), 15);
    }

    #[test]
    fn test_age_day_before_birthday() {
        assert_eq!(age_on(date(2010, 6, 15), date(2025, 6, 14)), 14);
    }

    #[test]
    fn test_age_leap_day() {
        assert_eq!(age_on(date(2012, 2, 29), date(2025, 2, 28)), 12);
        assert_eq!(age_on(date(2012, 2, 29), date(2025, 3, 1)), 13);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap();
        let window = ValidityWindow::new(Some(start), Some(end)).unwrap();

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + Duration::seconds(1)));
        assert!(window.is_pending_at(start - Duration::seconds(1)));
        assert!(window.is_expired_at(end + Duration::seconds(1)));
    }

    #[test]
    fn test_open_window_contains_everything() {
        let window = ValidityWindow::unbounded();
        assert!(window.contains(Utc::now()));
        assert!(window.contains(DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let start = Utc::now();
        let result = ValidityWindow::new(Some(start), Some(start - Duration::days(1)));
        assert!(matches!(result, Err(TemporalError::InvalidWindow { .. })));
    }

    #[test]
    fn test_timezone_parse() {
        assert!(Timezone::parse("America/Vancouver").is_ok());
        assert!(matches!(
            Timezone::parse("Mars/Olympus"),
            Err(TemporalError::UnknownTimezone(_))
        ));
    }
}
