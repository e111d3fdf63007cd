//! Usage aggregation periods.

use serde::{Deserialize, Serialize};

/// Period over which token usage is bucketed.
///
/// Each period implies both a window (how far back to look) and a bucket
/// granularity: `day` buckets by hour, `week` and `month` by day, `year`
/// by month. The default is [`UsagePeriod::Month`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl UsagePeriod {
    /// Number of buckets this period is divided into.
    #[must_use]
    pub const fn bucket_count(self) -> usize {
        match self {
            Self::Day => 24,
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 12,
        }
    }

    /// Length of one bucket in seconds.
    #[must_use]
    pub const fn bucket_seconds(self) -> i64 {
        match self {
            Self::Day => 60 * 60,
            Self::Week | Self::Month => 24 * 60 * 60,
            Self::Year => 30 * 24 * 60 * 60,
        }
    }

    /// Length of the whole window in seconds.
    #[must_use]
    pub const fn window_seconds(self) -> i64 {
        self.bucket_seconds() * self.bucket_count() as i64
    }
}

impl std::fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

impl std::str::FromStr for UsagePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(format!("invalid usage period: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_is_month() {
        assert_eq!(UsagePeriod::default(), UsagePeriod::Month);
    }

    #[test]
    fn test_bucket_counts() {
        assert_eq!(UsagePeriod::Day.bucket_count(), 24);
        assert_eq!(UsagePeriod::Week.bucket_count(), 7);
        assert_eq!(UsagePeriod::Month.bucket_count(), 30);
        assert_eq!(UsagePeriod::Year.bucket_count(), 12);
    }

    #[test]
    fn test_window_covers_all_buckets() {
        for period in [
            UsagePeriod::Day,
            UsagePeriod::Week,
            UsagePeriod::Month,
            UsagePeriod::Year,
        ] {
            assert_eq!(
                period.window_seconds(),
                period.bucket_seconds() * period.bucket_count() as i64
            );
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(UsagePeriod::from_str("week").expect("week"), UsagePeriod::Week);
        assert!(UsagePeriod::from_str("fortnight").is_err());
    }
}
