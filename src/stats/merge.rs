use std::collections::HashMap;

use super::{AccountId, StatPoint, TimeSeries};

/// Sums per-account series of a trailing window into exactly `count` buckets.
///
/// Inputs shorter than `count` contribute nothing past their end, points past
/// `count` are ignored.
pub fn merge_trailing_series(
    series: &HashMap<AccountId, TimeSeries>,
    count: usize,
) -> TimeSeries {
    merge_buckets(series.values(), count)
}

/// Sums per-account series of a chart window. The result is as long as the
/// longest input.
pub fn merge_chart_series(series: &HashMap<AccountId, TimeSeries>) -> TimeSeries {
    let count = series.values().map(Vec::len).max().unwrap_or(0);
    merge_buckets(series.values(), count)
}

fn merge_buckets<'a>(
    series: impl Iterator<Item = &'a TimeSeries> + Clone,
    count: usize,
) -> TimeSeries {
    (0..count)
        .map(|index| {
            series
                .clone()
                .filter_map(|points| points.get(index))
                .fold(StatPoint::default(), |mut merged, point| {
                    merged.bandwidth += point.bandwidth;
                    merged.traffic += point.traffic;
                    // Buckets at the same index share a timestamp
                    if point.timestamp != 0 {
                        merged.timestamp = point.timestamp;
                    }
                    merged
                })
        })
        .collect()
}
