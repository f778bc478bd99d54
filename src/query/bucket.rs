//! Aggregation bucket width.
//!
//! A window is down-sampled to roughly `target_points` mean values. The raw
//! width in whole seconds is rounded up into the coarsest of seconds, minutes
//! or hours that keeps the number small, e.g. 600s / 200 points -> `3s`,
//! 3 days / 200 points -> `22m`.

use std::fmt;

/// Unit of a [`BucketWidth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BucketUnit {
    Seconds,
    Minutes,
    Hours,
}

impl BucketUnit {
    fn suffix(&self) -> &'static str {
        match self {
            BucketUnit::Seconds => "s",
            BucketUnit::Minutes => "m",
            BucketUnit::Hours => "h",
        }
    }

    fn seconds(&self) -> u64 {
        match self {
            BucketUnit::Seconds => 1,
            BucketUnit::Minutes => 60,
            BucketUnit::Hours => 3600,
        }
    }
}

/// Width of one aggregation window, always a whole number of its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWidth {
    pub amount: u64,
    pub unit: BucketUnit,
}

impl BucketWidth {
    /// Derive the width for a window of `duration_secs` seconds.
    ///
    /// A zero (or negative) duration is treated as one second, so a degenerate
    /// window still yields a valid `1s` bucket.
    pub fn for_duration(duration_secs: i64, target_points: u32) -> Self {
        let duration = duration_secs.max(1) as u64;
        let points = u64::from(target_points.max(1));
        let raw = duration.div_ceil(points);

        if raw < 60 {
            Self {
                amount: raw,
                unit: BucketUnit::Seconds,
            }
        } else if raw < 3600 {
            Self {
                amount: raw.div_ceil(60),
                unit: BucketUnit::Minutes,
            }
        } else {
            Self {
                amount: raw.div_ceil(3600),
                unit: BucketUnit::Hours,
            }
        }
    }

    /// Total width in seconds.
    pub fn as_secs(&self) -> u64 {
        self.amount * self.unit.seconds()
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width(duration_secs: i64) -> String {
        BucketWidth::for_duration(duration_secs, 200).to_string()
    }

    #[test]
    fn test_ten_minutes_is_three_seconds() {
        assert_eq!(width(600), "3s");
    }

    #[test]
    fn test_unit_boundaries() {
        // ceil(11_800 / 200) = 59
        assert_eq!(width(11_800), "59s");
        // ceil(12_000 / 200) = 60 -> 1m
        assert_eq!(width(12_000), "1m");
        // ceil(12_001 / 200) = 61 -> ceil(61 / 60) = 2m
        assert_eq!(width(12_001), "2m");
        // ceil(719_800 / 200) = 3599 -> 60m
        assert_eq!(width(719_800), "60m");
        // ceil(720_000 / 200) = 3600 -> 1h
        assert_eq!(width(720_000), "1h");
    }

    #[test]
    fn test_three_days() {
        // 259_200 / 200 = 1296s -> 22m
        assert_eq!(width(3 * 24 * 3600), "22m");
    }

    #[test]
    fn test_degenerate_durations() {
        assert_eq!(width(0), "1s");
        assert_eq!(width(-30), "1s");
        assert_eq!(width(1), "1s");
        assert_eq!(BucketWidth::for_duration(600, 0).to_string(), "10m");
    }

    #[test]
    fn test_suffix_matches_raw_width_and_is_monotonic() {
        let mut last = 0;
        for d in (0..2_000_000).step_by(997) {
            let w = BucketWidth::for_duration(d, 200);
            let raw = (d.max(1) as u64).div_ceil(200);
            let expected = if raw < 60 {
                BucketUnit::Seconds
            } else if raw < 3600 {
                BucketUnit::Minutes
            } else {
                BucketUnit::Hours
            };
            assert_eq!(w.unit, expected, "duration {}", d);
            assert!(w.as_secs() >= last, "duration {}", d);
            last = w.as_secs();
        }
    }
}
