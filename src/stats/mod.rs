mod granularity;
mod merge;
mod point;
mod window;

pub use granularity::Granularity;
pub use merge::{merge_chart_series, merge_trailing_series};
pub use point::{AccountId, BaseStats, StatPoint, TimeSeries, UsageSummary};
pub use window::StatsWindow;
