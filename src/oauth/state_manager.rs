//! OAuth state management for CSRF protection.
//!
//! Every authorization attempt gets a short-lived, single-use state token
//! binding it to a user, organization and platform.

use super::Platform;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;

/// Random bytes per state token (encodes to 43 URL-safe characters)
const STATE_BYTES: usize = 32;

/// Default validity of an issued state (10 minutes)
pub const DEFAULT_STATE_TTL_SECONDS: i64 = 600;

/// Generate a cryptographically random, URL-safe token.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// OAuth state entry (tracks one in-flight authorization attempt)
#[derive(Clone, Debug)]
pub struct OAuthStateEntry {
    pub state: String,
    pub user_id: String,
    pub platform: Platform,
    pub organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthStateEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// OAuth state store with expiry.
///
/// The store exclusively owns its entries. A state is handed out by
/// [`issue`](Self::issue) and accepted by [`consume`](Self::consume) at most
/// once.
pub struct OAuthStateStore {
    states: DashMap<String, OAuthStateEntry>,
    ttl: Duration,
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_STATE_TTL_SECONDS))
    }
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    pub fn with_ttl_seconds(seconds: i64) -> Self {
        Self::new(Duration::seconds(seconds))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new state for an authorization attempt and store it.
    pub fn issue(&self, user_id: &str, platform: Platform, organization_id: Option<&str>) -> String {
        self.issue_at(user_id, platform, organization_id, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: &str,
        platform: Platform,
        organization_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> String {
        let state = generate_state_token();
        let entry = OAuthStateEntry {
            state: state.clone(),
            user_id: user_id.to_string(),
            platform,
            organization_id: organization_id.map(str::to_string),
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.states.insert(state.clone(), entry);
        tracing::debug!(platform = %platform, "OAuth state issued");

        state
    }

    /// Validate and consume a state token.
    ///
    /// The entry is removed by the same map operation that finds it, so with
    /// concurrent callbacks for one state exactly one caller gets `Some`.
    /// Expired entries are reported exactly like unknown ones.
    pub fn consume(&self, state: &str) -> Option<OAuthStateEntry> {
        self.consume_at(state, Utc::now())
    }

    fn consume_at(&self, state: &str, now: DateTime<Utc>) -> Option<OAuthStateEntry> {
        let (_, entry) = self.states.remove(state)?;

        if entry.is_expired(now) {
            tracing::debug!(platform = %entry.platform, "Expired OAuth state presented");
            return None;
        }

        Some(entry)
    }

    /// Drop expired states. Consumption already ignores them; this only
    /// reclaims memory.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.states.len();
        self.states.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.states.len())
    }

    /// Number of outstanding states (for monitoring)
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Background task to periodically purge expired states
pub async fn run_state_cleanup(store: Arc<OAuthStateStore>, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        let removed = store.purge_expired();
        tracing::debug!(removed, remaining = store.len(), "OAuth state cleanup complete");
    }
}
