use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{stats::AccountId, AccountsError};

/// Resolves an owner to the sub-accounts whose usage is aggregated for it
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn accounts(&self, owner: &str) -> Result<Vec<AccountId>, AccountsError>;
}

/// Owner to accounts table loaded from configuration.
///
/// Unknown owners have no accounts.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    owners: BTreeMap<String, Vec<AccountId>>,
}

impl StaticAccounts {
    pub fn new(owners: BTreeMap<String, Vec<AccountId>>) -> Self {
        Self { owners }
    }

    pub fn owners(&self) -> usize {
        self.owners.len()
    }
}

#[async_trait]
impl AccountSource for StaticAccounts {
    async fn accounts(&self, owner: &str) -> Result<Vec<AccountId>, AccountsError> {
        Ok(self.owners.get(owner).cloned().unwrap_or_default())
    }
}
