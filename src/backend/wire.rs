//! Response bodies of the metering backend.
//!
//! Empty collections may arrive as `null`, so every list is optional on the
//! wire and flattened to an empty `Vec` on conversion.

use serde::Deserialize;

use crate::{
    directory::PopRecord,
    stats::{BaseStats, StatPoint, TimeSeries},
};

#[derive(Debug, Deserialize)]
pub(crate) struct StatsResponse {
    #[serde(default)]
    stats: Option<Vec<WireStatPoint>>,
}

#[derive(Debug, Deserialize)]
struct WireStatPoint {
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    bandwidth: i64,
    #[serde(default)]
    traffic: i64,
}

impl From<StatsResponse> for TimeSeries {
    fn from(response: StatsResponse) -> Self {
        response
            .stats
            .unwrap_or_default()
            .into_iter()
            .map(|p| StatPoint::new(p.timestamp, p.bandwidth, p.traffic))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BaseStatsResponse {
    #[serde(default)]
    current_bandwidth: i64,
    #[serde(default)]
    total_traffic: i64,
}

impl From<BaseStatsResponse> for BaseStats {
    fn from(response: BaseStatsResponse) -> Self {
        BaseStats {
            current_bandwidth: response.current_bandwidth,
            total_traffic: response.total_traffic,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PopsResponse {
    #[serde(default)]
    pops: Option<Vec<WirePop>>,
}

#[derive(Debug, Deserialize)]
struct WirePop {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    area: String,
    #[serde(default, rename = "socks5Addr")]
    socks5_addr: String,
}

impl From<PopsResponse> for Vec<PopRecord> {
    fn from(response: PopsResponse) -> Self {
        response
            .pops
            .unwrap_or_default()
            .into_iter()
            .map(|p| PopRecord {
                id: p.id,
                name: p.name,
                area: p.area,
                socks5_address: p.socks5_addr,
            })
            .collect()
    }
}
