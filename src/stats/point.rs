use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a billable sub-account, unique within an owner.
pub type AccountId = String;

/// One bucket's aggregate for one or more accounts.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPoint {
    /// Bucket start, unix seconds
    pub timestamp: i64,
    pub bandwidth: i64,
    pub traffic: i64,
}

impl StatPoint {
    pub fn new(timestamp: i64, bandwidth: i64, traffic: i64) -> Self {
        Self {
            timestamp,
            bandwidth,
            traffic,
        }
    }

    /// Zero-valued point at a bucket boundary
    pub fn placeholder(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }
}

/// Bucket-aligned series, ascending by time.
pub type TimeSeries = Vec<StatPoint>;

/// Point-in-time usage of a single account.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub current_bandwidth: i64,
    pub total_traffic: i64,
}

/// Base usage of the accounts that answered, plus their totals.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub accounts: BTreeMap<AccountId, BaseStats>,
    pub total_current_bandwidth: i64,
    pub total_traffic: i64,
}

impl UsageSummary {
    pub fn insert(&mut self, account: AccountId, stats: BaseStats) {
        if let Some(previous) = self.accounts.insert(account, stats) {
            self.total_current_bandwidth -= previous.current_bandwidth;
            self.total_traffic -= previous.total_traffic;
        }
        self.total_current_bandwidth += stats.current_bandwidth;
        self.total_traffic += stats.total_traffic;
    }
}
