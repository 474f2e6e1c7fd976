//! Canonical `YYYY-MM-DD` day keys in the user's local calendar.
//!
//! Every other module works with [`DateKey`] only. Instants are converted by
//! reading the year/month/day fields after shifting into the user's offset,
//! never by slicing a UTC timestamp string.

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Duration, Month,
    OffsetDateTime, UtcOffset,
};
use chrono::TimeZone;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(Date);

/// Anything a caller may hand to [`DateKey::normalize`].
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Instant(OffsetDateTime),
    Calendar(Date),
    Text(&'a str),
}

impl From<OffsetDateTime> for DateInput<'_> {
    fn from(v: OffsetDateTime) -> Self {
        DateInput::Instant(v)
    }
}

impl From<Date> for DateInput<'_> {
    fn from(v: Date) -> Self {
        DateInput::Calendar(v)
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(v: &'a str) -> Self {
        DateInput::Text(v)
    }
}

fn is_day_key(s: &str) -> bool {
    lazy_static! {
        static ref DAY_KEY_RE: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
    }
    DAY_KEY_RE.is_match(s)
}

impl DateKey {
    pub fn normalize<'a>(input: impl Into<DateInput<'a>>, offset: UtcOffset) -> Result<Self, AppError> {
        Self::normalize_with(input, |_| offset)
    }

    /// Like [`normalize`](Self::normalize), but the offset may differ per instant.
    fn normalize_with<'a>(
        input: impl Into<DateInput<'a>>,
        offset_at: impl Fn(OffsetDateTime) -> UtcOffset,
    ) -> Result<Self, AppError> {
        match input.into() {
            DateInput::Instant(at) => Ok(Self::from_instant(at, offset_at(at))),
            DateInput::Calendar(date) => Ok(Self(date)),
            DateInput::Text(raw) => {
                let raw = raw.trim();
                if is_day_key(raw) {
                    return Self::parse_day_key(raw);
                }
                let at = OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| invalid(raw))?;
                Ok(Self::from_instant(at, offset_at(at)))
            }
        }
    }

    pub fn from_instant(at: OffsetDateTime, offset: UtcOffset) -> Self {
        Self(at.to_offset(offset).date())
    }

    pub fn date(self) -> Date {
        self.0
    }

    /// The key `days` calendar days earlier.
    pub fn days_before(self, days: i64) -> Option<Self> {
        self.0.checked_sub(Duration::days(days)).map(Self)
    }

    /// Already a calendar day: take the fields as they are.
    fn parse_day_key(raw: &str) -> Result<Self, AppError> {
        let year: i32 = raw[0..4].parse().map_err(|_| invalid(raw))?;
        let month: u8 = raw[5..7].parse().map_err(|_| invalid(raw))?;
        let day: u8 = raw[8..10].parse().map_err(|_| invalid(raw))?;
        let month = Month::try_from(month).map_err(|_| invalid(raw))?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid(raw))
    }
}

fn invalid(raw: &str) -> AppError {
    AppError::InvalidDate(format!("'{raw}' is not a valid calendar date"))
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

/// Strict `YYYY-MM-DD` parsing; timestamps need an offset and go through `normalize`.
impl FromStr for DateKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !is_day_key(s) {
            return Err(invalid(s));
        }
        Self::parse_day_key(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Where the user's UTC offset comes from.
#[derive(Debug, Clone, Copy)]
enum OffsetRule {
    /// Configured explicitly; never changes.
    Fixed(UtcOffset),
    /// The host zone, asked per instant so daylight-saving changes are honoured.
    /// `fallback` is used when the lookup has no answer.
    Host {
        fallback: UtcOffset,
        lookup: fn(OffsetDateTime) -> Option<UtcOffset>,
    },
}

/// The user's calendar: turns instants into day keys in their local time.
#[derive(Debug, Clone, Copy)]
pub struct LocalCalendar {
    rule: OffsetRule,
}

/// The host zone's offset at `at`, read through chrono's `Local`, which
/// is usable from a multi-threaded runtime.
fn host_offset_at(at: OffsetDateTime) -> Option<UtcOffset> {
    let utc = chrono::DateTime::from_timestamp(at.unix_timestamp(), 0)?;
    let secs = chrono::Local
        .offset_from_utc_datetime(&utc.naive_utc())
        .local_minus_utc();
    UtcOffset::from_whole_seconds(secs).ok()
}

impl LocalCalendar {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            rule: OffsetRule::Fixed(offset),
        }
    }

    /// Follows the host's time zone, or UTC when it cannot be determined.
    pub fn system() -> Self {
        let fallback = host_offset_at(OffsetDateTime::now_utc()).unwrap_or_else(|| {
            warn!("local offset unavailable; using UTC");
            UtcOffset::UTC
        });
        Self::host(fallback, host_offset_at)
    }

    fn host(fallback: UtcOffset, lookup: fn(OffsetDateTime) -> Option<UtcOffset>) -> Self {
        Self {
            rule: OffsetRule::Host { fallback, lookup },
        }
    }

    pub fn offset_at(&self, at: OffsetDateTime) -> UtcOffset {
        match self.rule {
            OffsetRule::Fixed(offset) => offset,
            OffsetRule::Host { fallback, lookup } => lookup(at).unwrap_or(fallback),
        }
    }

    pub fn today(&self) -> DateKey {
        let now = OffsetDateTime::now_utc();
        DateKey::from_instant(now, self.offset_at(now))
    }

    pub fn normalize<'a>(&self, input: impl Into<DateInput<'a>>) -> Result<DateKey, AppError> {
        DateKey::normalize_with(input, |at| self.offset_at(at))
    }
}

/// Parses `+05:30`, `-07:00` or `Z`.
pub fn parse_offset(raw: &str) -> Result<UtcOffset, AppError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(raw, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
        .map_err(|_| AppError::validation(format!("'{raw}' is not a valid UTC offset")))
}
