use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width of the buckets a series is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// 5 minute buckets, named `minute` by the chart endpoint
    #[serde(rename = "minute")]
    FiveMinutes,
    Hour,
    Day,
}

impl Granularity {
    pub const FIVE_MINUTES_SECS: i64 = 5 * 60;
    pub const HOUR_SECS: i64 = 60 * 60;
    pub const DAY_SECS: i64 = 24 * 60 * 60;

    /// Bucket width in seconds
    pub fn width_secs(&self) -> i64 {
        match self {
            Granularity::FiveMinutes => Self::FIVE_MINUTES_SECS,
            Granularity::Hour => Self::HOUR_SECS,
            Granularity::Day => Self::DAY_SECS,
        }
    }

    /// Seconds in one unit of a trailing window's span (minutes, hours or days)
    pub fn span_unit_secs(&self) -> i64 {
        match self {
            Granularity::FiveMinutes => 60,
            Granularity::Hour => Self::HOUR_SECS,
            Granularity::Day => Self::DAY_SECS,
        }
    }

    /// Backend path segment for trailing window queries
    pub fn trailing_path(&self) -> &'static str {
        match self {
            Granularity::FiveMinutes => "per5min",
            Granularity::Hour => "perhour",
            Granularity::Day => "perday",
        }
    }

    /// Backend query parameter carrying the trailing window span
    pub fn span_param(&self) -> &'static str {
        match self {
            Granularity::FiveMinutes => "minutes",
            Granularity::Hour => "hours",
            Granularity::Day => "days",
        }
    }

    /// Name used by the chart endpoint's `type` parameter
    pub fn chart_type(&self) -> &'static str {
        match self {
            Granularity::FiveMinutes => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }

    /// Parses the trailing path segment (`per5min`, `perhour`, `perday`)
    pub fn from_trailing_path(path: &str) -> Option<Self> {
        match path {
            "per5min" => Some(Granularity::FiveMinutes),
            "perhour" => Some(Granularity::Hour),
            "perday" => Some(Granularity::Day),
            _ => None,
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Granularity::FiveMinutes),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.chart_type())
    }
}
