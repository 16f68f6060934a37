use thiserror::Error;

use super::{
    AccountsError, AggregateError, BackendError, ConfigValidationError, DirectoryError,
    InitializationError,
};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("Initialization error: {0}")]
    Init(#[from] InitializationError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Accounts error: {0}")]
    Accounts(#[from] AccountsError),
}

impl GatewayError {
    pub fn config(kind: ConfigValidationError) -> Self {
        GatewayError::Config(kind)
    }

    pub fn init(kind: InitializationError) -> Self {
        GatewayError::Init(kind)
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(ConfigValidationError::config(err.to_string()))
    }
}
