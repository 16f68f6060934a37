use std::sync::Arc;

use thiserror::Error;

use super::BackendError;

/// Pop directory lookup failure.
///
/// Cloneable so one refresh outcome can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone)]
pub enum DirectoryError {
    #[error("Pop {0} does not exist")]
    NotFound(String),

    #[error("Pop directory refresh failed: {0}")]
    Refresh(#[source] Arc<BackendError>),

    #[error("Pop directory refresh aborted: {0}")]
    RefreshAborted(String),
}

impl DirectoryError {
    pub fn not_found(pop_id: impl Into<String>) -> Self {
        Self::NotFound(pop_id.into())
    }

    pub fn refresh_aborted(details: impl Into<String>) -> Self {
        Self::RefreshAborted(details.into())
    }
}

impl From<BackendError> for DirectoryError {
    fn from(err: BackendError) -> Self {
        Self::Refresh(Arc::new(err))
    }
}
