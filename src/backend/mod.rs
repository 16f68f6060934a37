//! Metering backend access.
//!
//! The aggregator and the pop directory only see the [`StatsSource`] and
//! [`PopSource`] traits; [`BackendClient`] implements both over HTTP.

mod client;
mod token;
mod wire;

use async_trait::async_trait;

pub use client::BackendClient;
pub use token::{resolve_access_token, sign_access_token};

use crate::{
    directory::PopRecord,
    stats::{BaseStats, StatsWindow, TimeSeries},
    BackendError,
};

/// Per-account usage data
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// One account's series over `window`, in backend order
    async fn fetch_series(
        &self,
        account: &str,
        window: &StatsWindow,
    ) -> Result<TimeSeries, BackendError>;

    /// One account's current bandwidth and total traffic
    async fn fetch_base_stats(&self, account: &str) -> Result<BaseStats, BackendError>;
}

/// Full pop list
#[async_trait]
pub trait PopSource: Send + Sync {
    async fn fetch_pops(&self) -> Result<Vec<PopRecord>, BackendError>;
}
