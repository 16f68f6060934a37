use thiserror::Error;

use super::BackendError;
use crate::stats::AccountId;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Get account {account} stats: {source}")]
    Fetch {
        account: AccountId,
        #[source]
        source: BackendError,
    },

    #[error("Stats task for account {account} failed: {details}")]
    TaskFailed { account: AccountId, details: String },

    #[error("Invalid chart type: {0}")]
    InvalidChartType(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

impl AggregateError {
    pub fn fetch(account: impl Into<AccountId>, source: BackendError) -> Self {
        Self::Fetch {
            account: account.into(),
            source,
        }
    }

    pub fn task_failed(account: impl Into<AccountId>, details: impl Into<String>) -> Self {
        Self::TaskFailed {
            account: account.into(),
            details: details.into(),
        }
    }

    /// Account whose fetch produced this error, if any
    pub fn account(&self) -> Option<&str> {
        match self {
            Self::Fetch { account, .. } | Self::TaskFailed { account, .. } => Some(account),
            _ => None,
        }
    }

    /// True when the caller supplied bad parameters rather than the backend failing
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidChartType(_) | Self::InvalidWindow(_))
    }
}
