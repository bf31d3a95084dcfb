//! Service time handling.
//!
//! Schedules express stop times as seconds since midnight of the service
//! day, written `HH:MM` or `HH:MM:SS`. Hours may
//! run past 23 for trips that continue after midnight. Searches themselves
//! work in absolute epoch seconds; [`ServiceDay`] converts between the two.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Error returned when parsing an invalid service time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Latest hour accepted in a service time (two full days).
const MAX_SERVICE_HOUR: u32 = 47;

/// Parse a service time (`HH:MM` or `HH:MM:SS`) into seconds since midnight.
///
/// # Examples
///
/// ```
/// use transit_router::domain::parse_service_time;
///
/// assert_eq!(parse_service_time("08:30").unwrap(), 8 * 3600 + 30 * 60);
/// assert_eq!(parse_service_time("25:00:10").unwrap(), 25 * 3600 + 10);
///
/// assert!(parse_service_time("8:30").is_err());
/// assert!(parse_service_time("08:60").is_err());
/// ```
pub fn parse_service_time(s: &str) -> Result<i32, TimeError> {
    let bytes = s.as_bytes();

    if bytes.len() != 5 && bytes.len() != 8 {
        return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
    }

    if bytes[2] != b':' {
        return Err(TimeError::new("expected colon at position 2"));
    }

    let hour =
        parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    if hour > MAX_SERVICE_HOUR {
        return Err(TimeError::new("hour must be 0-47"));
    }

    let minute =
        parse_two_digits(&bytes[3..5]).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    let second = if bytes.len() == 8 {
        if bytes[5] != b':' {
            return Err(TimeError::new("expected colon at position 5"));
        }
        let second = parse_two_digits(&bytes[6..8])
            .ok_or_else(|| TimeError::new("invalid second digits"))?;
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }
        second
    } else {
        0
    };

    Ok((hour * 3600 + minute * 60 + second) as i32)
}

/// Format seconds since midnight as `HH:MM:SS`.
///
/// Negative values (a reverse search running before midnight) are
/// prefixed with `-`.
pub fn format_service_time(seconds: i32) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let s = seconds.unsigned_abs();
    format!("{sign}{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// The calendar day a set of schedules runs on.
///
/// Holds the epoch second of the day's midnight (UTC) so that schedule
/// offsets can be turned into absolute times and back.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceDay {
    date: NaiveDate,
    midnight: i64,
}

impl ServiceDay {
    /// Create the service day for a calendar date.
    pub fn new(date: NaiveDate) -> Self {
        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        Self { date, midnight }
    }

    /// Returns the calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns midnight as epoch seconds.
    pub fn midnight(&self) -> i64 {
        self.midnight
    }

    /// Convert an absolute epoch time into seconds since this day's midnight.
    ///
    /// Saturates at the `i32` range; search horizons are far shorter.
    pub fn seconds_since_midnight(&self, epoch_seconds: i64) -> i32 {
        let offset = epoch_seconds - self.midnight;
        offset.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Convert seconds since midnight into absolute epoch seconds.
    pub fn to_epoch(&self, seconds: i32) -> i64 {
        self.midnight + seconds as i64
    }

    /// Absolute epoch seconds for a service time string on this day.
    pub fn time(&self, hhmmss: &str) -> Result<i64, TimeError> {
        Ok(self.to_epoch(parse_service_time(hhmmss)?))
    }
}

impl fmt::Debug for ServiceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceDay({})", self.date)
    }
}

impl Default for ServiceDay {
    fn default() -> Self {
        Self::new(NaiveDate::default())
    }
}

/// Epoch seconds for a UTC date-time.
pub fn epoch_seconds(date_time: DateTime<Utc>) -> i64 {
    date_time.timestamp()
}
