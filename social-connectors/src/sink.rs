//! Hand-off point for connected accounts.
//!
//! The OAuth layer never persists anything itself. Completed connections are
//! passed to an [`AccountSink`]; the surrounding application decides where
//! the (already encrypted) tokens live.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use socialink::oauth::{ConnectedAccount, Platform};

#[async_trait]
pub trait AccountSink: Send + Sync {
    /// Persist or replace the account for `(user_id, platform)`.
    async fn save(&self, account: ConnectedAccount) -> Result<()>;
}

/// Accounts keyed by `(user_id, platform)`, kept in memory.
#[derive(Default)]
pub struct InMemoryAccountSink {
    accounts: DashMap<(String, Platform), ConnectedAccount>,
}

impl InMemoryAccountSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str, platform: Platform) -> Option<ConnectedAccount> {
        self.accounts
            .get(&(user_id.to_string(), platform))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, user_id: &str, platform: Platform) -> Option<ConnectedAccount> {
        self.accounts
            .remove(&(user_id.to_string(), platform))
            .map(|(_, account)| account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountSink for InMemoryAccountSink {
    async fn save(&self, account: ConnectedAccount) -> Result<()> {
        tracing::debug!(
            platform = %account.platform,
            user_id = %account.user_id,
            "Storing connected account"
        );
        self.accounts
            .insert((account.user_id.clone(), account.platform), account);
        Ok(())
    }
}
