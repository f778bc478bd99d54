//! Time window resolution for historical, relative and live charts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::BucketWidth;
use crate::error::{Error, Result};

/// A resolved `[start, stop)` range and its aggregation bucket.
///
/// `bucket` is `None` for live windows, which take the last sample per series
/// instead of aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub bucket: Option<BucketWidth>,
}

impl TimeWindow {
    /// Build an aggregated window, deriving the bucket width from its length.
    pub fn aggregated(start: DateTime<Utc>, stop: DateTime<Utc>, target_points: u32) -> Self {
        let duration_secs = (stop - start).num_seconds();
        Self {
            start,
            stop,
            bucket: Some(BucketWidth::for_duration(duration_secs, target_points)),
        }
    }

    /// A short look-back ending at `now`, used to pick up the latest sample.
    pub fn live(now: DateTime<Utc>, lookback: TimeDelta) -> Self {
        Self {
            start: now - lookback,
            stop: now,
            bucket: None,
        }
    }

    /// Resolve an explicit wall-clock range in the server's local time zone.
    pub fn historical(range: &HistoricalRange, target_points: u32) -> Result<Self> {
        Self::historical_in(range, &Local, target_points)
    }

    /// Resolve an explicit wall-clock range in the given time zone.
    pub fn historical_in<Tz: TimeZone>(
        range: &HistoricalRange,
        tz: &Tz,
        target_points: u32,
    ) -> Result<Self> {
        let start = parse_wall_clock(&range.start_date, &range.start_time, tz)?;
        let stop = parse_wall_clock(&range.end_date, &range.end_time, tz)?;

        if stop <= start {
            return Err(Error::InvalidTimeRange(format!(
                "end {} is not after start {}",
                stop.to_rfc3339(),
                start.to_rfc3339()
            )));
        }

        Ok(Self::aggregated(start, stop, target_points))
    }

    /// Resolve a relative token such as `-10m` into a window ending at `now`.
    pub fn relative(token: &str, now: DateTime<Utc>, target_points: u32) -> Result<Self> {
        let offset = RelativeOffset::parse(token)?;
        let start = offset
            .to_delta()
            .and_then(|delta| now.checked_sub_signed(delta))
            .ok_or_else(|| Error::InvalidAmount(token.to_string()))?;
        Ok(Self::aggregated(start, now, target_points))
    }
}

/// Date and time fields of a historical chart request, in local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRange {
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `HH:MM` or `HH:MM:SS`
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
}

fn parse_wall_clock<Tz: TimeZone>(date: &str, time: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidTimeRange(format!("cannot parse '{} {}'", date, time));

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .map_err(|_| invalid())?;

    // Ambiguous local times (DST fall-back) resolve to the earlier instant;
    // skipped ones (spring-forward) are rejected.
    tz.from_local_datetime(&NaiveDateTime::new(date, time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Unit of a relative offset token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl OffsetUnit {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(OffsetUnit::Seconds),
            'm' => Some(OffsetUnit::Minutes),
            'h' => Some(OffsetUnit::Hours),
            'd' => Some(OffsetUnit::Days),
            _ => None,
        }
    }

    fn seconds(&self) -> i64 {
        match self {
            OffsetUnit::Seconds => 1,
            OffsetUnit::Minutes => 60,
            OffsetUnit::Hours => 3600,
            OffsetUnit::Days => 86_400,
        }
    }

    fn suffix(&self) -> char {
        match self {
            OffsetUnit::Seconds => 's',
            OffsetUnit::Minutes => 'm',
            OffsetUnit::Hours => 'h',
            OffsetUnit::Days => 'd',
        }
    }
}

/// A parsed `-<amount><unit>` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeOffset {
    pub amount: u64,
    pub unit: OffsetUnit,
}

impl RelativeOffset {
    /// Parse tokens like `-45s`, `-10m`, `-3h`, `-30d`.
    ///
    /// The unit is checked first, so `-5x` is an [`Error::InvalidUnit`] and
    /// `-xm` an [`Error::InvalidAmount`].
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let unit = token
            .chars()
            .last()
            .and_then(OffsetUnit::from_suffix)
            .ok_or_else(|| Error::InvalidUnit(token.to_string()))?;

        let amount = token[..token.len() - 1]
            .strip_prefix('-')
            .and_then(|digits| digits.parse::<u64>().ok())
            .ok_or_else(|| Error::InvalidAmount(token.to_string()))?;

        Ok(Self { amount, unit })
    }

    /// The offset as a duration, or `None` if it overflows.
    pub fn to_delta(&self) -> Option<TimeDelta> {
        let amount = i64::try_from(self.amount).ok()?;
        amount
            .checked_mul(self.unit.seconds())
            .and_then(TimeDelta::try_seconds)
    }
}

impl fmt::Display for RelativeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for RelativeOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
