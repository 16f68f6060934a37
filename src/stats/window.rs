use serde::Serialize;

use super::{Granularity, StatPoint, TimeSeries};

/// Time range of a usage query.
///
/// Two bucket counting rules apply, one per window kind:
///
/// * trailing windows carry exactly `window_secs / width` buckets, ending at
///   the bucket that contains "now";
/// * chart windows enumerate `start / width ..= end / width` inclusively.
///
/// For an aligned trailing window the inclusive enumeration would produce one
/// extra bucket, so the two are never mixed for the same window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatsWindow {
    /// The last `span` minutes, hours or days, depending on granularity
    Trailing { granularity: Granularity, span: u32 },
    /// Explicit unix-second bounds
    Chart {
        granularity: Granularity,
        start: i64,
        end: i64,
    },
}

impl StatsWindow {
    /// Largest number of buckets a single query may cover
    pub const MAX_BUCKETS: usize = 10_000;

    pub fn trailing(granularity: Granularity, span: u32) -> Self {
        StatsWindow::Trailing { granularity, span }
    }

    pub fn chart(granularity: Granularity, start: i64, end: i64) -> Self {
        StatsWindow::Chart {
            granularity,
            start,
            end,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            StatsWindow::Trailing { granularity, .. } | StatsWindow::Chart { granularity, .. } => {
                *granularity
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            StatsWindow::Trailing { granularity, span } => {
                if span == 0 {
                    return Err("span must be non-zero".to_string());
                }
                if self.trailing_bucket_count() == Some(0) {
                    return Err(format!(
                        "{} {} is shorter than one {} bucket",
                        span,
                        granularity.span_param(),
                        granularity
                    ));
                }
            }
            StatsWindow::Chart { start, end, .. } => {
                if start < 0 {
                    return Err(format!("start_time {} must not be negative", start));
                }
                if end < start {
                    return Err(format!("end_time {} is before start_time {}", end, start));
                }
            }
        }

        match self.bucket_count() {
            Some(count) if count <= Self::MAX_BUCKETS => Ok(()),
            _ => Err(format!(
                "window covers more than {} {} buckets",
                Self::MAX_BUCKETS,
                self.granularity()
            )),
        }
    }

    /// Number of buckets the window covers, `None` on overflow
    pub fn bucket_count(&self) -> Option<usize> {
        match *self {
            StatsWindow::Trailing { .. } => self.trailing_bucket_count(),
            StatsWindow::Chart {
                granularity,
                start,
                end,
            } => {
                let width = granularity.width_secs();
                (end / width)
                    .checked_sub(start / width)?
                    .checked_add(1)
                    .and_then(|count| usize::try_from(count).ok())
            }
        }
    }

    /// Bucket count of a trailing window, `None` for chart windows
    pub fn trailing_bucket_count(&self) -> Option<usize> {
        match *self {
            StatsWindow::Trailing { granularity, span } => {
                let window_secs = i64::from(span).checked_mul(granularity.span_unit_secs())?;
                usize::try_from(window_secs / granularity.width_secs()).ok()
            }
            StatsWindow::Chart { .. } => None,
        }
    }

    /// Zero-filled series used when there is nothing to merge
    pub fn placeholder(&self, now: i64) -> TimeSeries {
        let width = self.granularity().width_secs();

        let (first, last) = match *self {
            StatsWindow::Trailing { .. } => {
                let count = self.trailing_bucket_count().unwrap_or(0) as i64;
                let last = now / width;
                (last - count + 1, last)
            }
            StatsWindow::Chart { start, end, .. } => (start / width, end / width),
        };

        (first..=last)
            .map(|index| StatPoint::placeholder(index * width))
            .collect()
    }
}
