//! Time handling: query intervals and the per-period temporal key.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Period used to deduplicate catalog items and order raster samples.
///
/// Biomass products are annual, so the key is the calendar year of the
/// item's acquisition datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemporalKey(pub i32);

impl TemporalKey {
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self(dt.year())
    }

    pub fn year(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A closed time interval `[start, end]` for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeParseError> {
        if start > end {
            return Err(TimeParseError::InvertedRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse an ISO 8601 interval: "2015-06-30/2019-07-30" or full datetimes.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()))?;
        Self::new(parse_instant(start.trim())?, parse_instant(end.trim())?)
    }

    /// The two interval bounds as RFC 3339 strings with a `Z` suffix, the
    /// form CQL2 `interval` literals expect.
    pub fn to_interval_strings(&self) -> [String; 2] {
        [
            self.start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            self.end.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        ]
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [start, end] = self.to_interval_strings();
        write!(f, "{}/{}", start, end)
    }
}

/// Parse an ISO 8601 instant, date-time without zone (assumed UTC), or date.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_interval() {
        let range = TimeRange::parse("2015-06-30/2019-07-30").unwrap();
        assert_eq!(
            range.to_interval_strings(),
            [
                "2015-06-30T00:00:00Z".to_string(),
                "2019-07-30T00:00:00Z".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_rejects_inverted() {
        assert!(matches!(
            TimeRange::parse("2019-01-01/2015-01-01"),
            Err(TimeParseError::InvertedRange { .. })
        ));
        assert!(TimeRange::parse("2019-01-01").is_err());
    }

    #[test]
    fn test_parse_mixed_instants() {
        let range = TimeRange::parse("2005-01-01/2020-12-31T23:59:59").unwrap();
        assert_eq!(
            range.to_string(),
            "2005-01-01T00:00:00Z/2020-12-31T23:59:59Z"
        );
        assert!(TimeRange::new(range.end, range.start).is_err());
        assert!(TimeRange::new(range.start, range.start).is_ok());
    }

    #[test]
    fn test_temporal_key_ordering() {
        let a = TemporalKey::from_datetime(&parse_instant("2016-01-01").unwrap());
        let b = TemporalKey::from_datetime(&parse_instant("2015-12-31T23:00:00Z").unwrap());
        assert!(b < a);
        assert_eq!(a.year(), 2016);
        assert_eq!(b.to_string(), "2015");
    }
}
