//! Defines [`Cycle`], the timestamp identifying one forecast model run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("'{0}' is not an ISO-8601 date-time")]
pub struct CycleParseError(String);

/// A forecast model run, always held in UTC.
///
/// Parsing accepts the ISO-8601 forms an operator is likely to type. A timestamp
/// without an offset is taken to be UTC already.
///
/// # Examples
///
/// ```
/// use nwp_download::Cycle;
///
/// let cycle: Cycle = "2024-01-01T06:00:00".parse().unwrap();
/// assert_eq!(cycle.isoformat(), "2024-01-01T06:00:00");
/// assert_eq!(cycle.to_string(), "2024-01-01T06:00:00Z");
///
/// let shifted: Cycle = "2024-01-01T07:00:00+01:00".parse().unwrap();
/// assert_eq!(shifted, cycle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle(DateTime<Utc>);

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

impl Cycle {
    pub fn new(run: DateTime<Utc>) -> Self {
        Self(run)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// The run time without any zone marker. Fractional seconds appear as
    /// six digits (microseconds) when they are non-zero.
    pub fn isoformat(&self) -> String {
        if self.0.nanosecond() / 1_000 == 0 {
            self.0.format("%Y-%m-%dT%H:%M:%S").to_string()
        } else {
            self.0.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
        }
    }

    /// [`Self::isoformat`] followed by `Z`, the form the catalog and the
    /// artifact names use.
    pub fn iso_z(&self) -> String {
        format!("{}Z", self.isoformat())
    }
}

impl From<DateTime<Utc>> for Cycle {
    fn from(run: DateTime<Utc>) -> Self {
        Self(run)
    }
}

impl FromStr for Cycle {
    type Err = CycleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        if let Ok(with_offset) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self(with_offset.with_timezone(&Utc)));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self(naive.and_utc()));
            }
        }

        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Self(midnight.and_utc()))
            .ok_or_else(|| CycleParseError(s.to_string()))
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iso_z())
    }
}
