//! Protocol datestamps and their conversion to index timestamps.
//!
//! The index stores modification times as epoch milliseconds. Requests carry
//! either day granularity (`YYYY-MM-DD`) or second granularity
//! (`YYYY-MM-DDThh:mm:ssZ`).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Upper bound used when a request has no `until`: 9999-12-31T23:59:59Z.
pub const FAR_FUTURE_MS: i64 = 253_402_300_799_000;

/// Added to `until` when the window collapses to one instant.
pub const SINGLE_INSTANT_EPSILON_MS: i64 = 999;

/// Width of the zero-padded timestamps used in range queries.
const TIMESTAMP_WIDTH: usize = 13;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SECONDS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").expect("valid regex")
});

/// Precision of a request datestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Seconds,
}

/// A validated request datestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datestamp {
    pub granularity: Granularity,
    date: NaiveDate,
    seconds: Option<NaiveDateTime>,
}

impl Datestamp {
    /// Parse a datestamp in either supported granularity.
    ///
    /// # Examples
    /// ```
    /// use oai_connector::query::datestamp::{Datestamp, Granularity};
    ///
    /// let day = Datestamp::parse("2020-01-01").unwrap();
    /// assert_eq!(day.granularity, Granularity::Day);
    /// assert!(Datestamp::parse("2020-02-30").is_none());
    /// assert!(Datestamp::parse("2020-01-01T10:00:00").is_none());
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if DAY_PATTERN.is_match(value) {
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
            return Some(Self {
                granularity: Granularity::Day,
                date,
                seconds: None,
            });
        }
        if SECONDS_PATTERN.is_match(value) {
            let dt = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ").ok()?;
            return Some(Self {
                granularity: Granularity::Seconds,
                date: dt.date(),
                seconds: Some(dt),
            });
        }
        None
    }

    /// Epoch milliseconds at the start of the covered interval.
    #[must_use]
    pub fn lower_bound_ms(&self) -> i64 {
        let dt = self
            .seconds
            .unwrap_or_else(|| self.date.and_time(chrono::NaiveTime::MIN));
        Utc.from_utc_datetime(&dt).timestamp_millis()
    }

    /// Epoch milliseconds at the last whole second of the covered interval.
    #[must_use]
    pub fn upper_bound_ms(&self) -> i64 {
        match self.seconds {
            Some(dt) => Utc.from_utc_datetime(&dt).timestamp_millis(),
            None => self.lower_bound_ms() + (24 * 60 * 60 - 1) * 1000,
        }
    }
}

/// Lower window bound for an optional `from` argument. Absent means epoch.
#[must_use]
pub fn from_timestamp(from: Option<&str>) -> i64 {
    from.and_then(Datestamp::parse)
        .map_or(0, |d| d.lower_bound_ms())
}

/// Upper window bound for an optional `until` argument.
#[must_use]
pub fn until_timestamp(until: Option<&str>) -> i64 {
    until
        .and_then(Datestamp::parse)
        .map_or(FAR_FUTURE_MS, |d| d.upper_bound_ms())
}

/// Left-pad a millisecond timestamp with zeros to a fixed width so that
/// lexical and numeric order agree. Negative values are left alone.
///
/// # Examples
/// ```
/// use oai_connector::query::datestamp::normalize_timestamp;
///
/// assert_eq!(normalize_timestamp(0), "0000000000000");
/// assert_eq!(normalize_timestamp(1_577_836_800_000), "1577836800000");
/// ```
#[must_use]
pub fn normalize_timestamp(ms: i64) -> String {
    if ms < 0 {
        return ms.to_string();
    }
    format!("{ms:0>width$}", width = TIMESTAMP_WIDTH)
}

/// Format epoch milliseconds as `YYYY-MM-DDThh:mm:ssZ`.
#[must_use]
pub fn format_datestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// Format a point in time as `YYYY-MM-DDThh:mm:ssZ`.
#[must_use]
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        let d = Datestamp::parse("2020-01-01T12:30:00Z").unwrap();
        assert_eq!(d.granularity, Granularity::Seconds);
        assert_eq!(d.lower_bound_ms(), 1_577_881_800_000);
        assert_eq!(d.upper_bound_ms(), 1_577_881_800_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Datestamp::parse("").is_none());
        assert!(Datestamp::parse("2020-1-1").is_none());
        assert!(Datestamp::parse("2020-01-01T25:00:00Z").is_none());
        assert!(Datestamp::parse(" 2020-01-01").is_none());
    }

    #[test]
    fn test_day_bounds() {
        assert_eq!(from_timestamp(Some("2020-01-01")), 1_577_836_800_000);
        assert_eq!(until_timestamp(Some("2020-01-01")), 1_577_923_199_000);
    }

    #[test]
    fn test_absent_bounds() {
        assert_eq!(from_timestamp(None), 0);
        assert_eq!(until_timestamp(None), FAR_FUTURE_MS);
        assert_eq!(format_datestamp(FAR_FUTURE_MS), "9999-12-31T23:59:59Z");
    }

    #[test]
    fn test_normalize_timestamp_pads() {
        assert_eq!(normalize_timestamp(12_345_678), "0000012345678");
        assert_eq!(normalize_timestamp(-5), "-5");
        assert_eq!(normalize_timestamp(FAR_FUTURE_MS), "253402300799000");
    }

    #[test]
    fn test_format_datestamp() {
        assert_eq!(format_datestamp(1_577_836_800_000), "2020-01-01T00:00:00Z");
    }
}
