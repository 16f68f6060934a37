pub mod accounts;
pub mod aggregator;
pub mod backend;
pub mod config;
pub mod directory;
pub mod errors;
pub mod http_api;
pub mod logging;
pub mod stats;
pub mod utils;

pub use accounts::{AccountSource, StaticAccounts};
pub use aggregator::Aggregator;
pub use backend::{BackendClient, PopSource, StatsSource};
pub use config::{BackendConfig, FanoutConfig, GatewayConfig, HttpConfig, LoggingConfig};
pub use directory::{PopDirectory, PopRecord};
pub use errors::{
    AccountsError, AggregateError, BackendError, ConfigValidationError, DirectoryError,
    GatewayError, InitializationError,
};
pub use http_api::{router, start_http_server, ApiState};
pub use logging::setup_logging;
pub use stats::{
    AccountId, BaseStats, Granularity, StatPoint, StatsWindow, TimeSeries, UsageSummary,
};
