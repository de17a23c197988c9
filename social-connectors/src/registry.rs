//! Connector registry - builds and looks up the configured platform adapters.

use crate::platforms::{
    FacebookConnector, InstagramConnector, LinkedinConnector, TiktokConnector, TwitterConnector,
};
use socialink::config::{AppConfig, PlatformCredentialsConfig};
use socialink::content::ContentPublisher;
use socialink::credentials::TokenCipher;
use socialink::oauth::{OAuthService, Platform, ProviderClient};
use socialink::OAuthResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Adapters keyed by platform. Immutable once built.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<Platform, Arc<dyn ContentPublisher>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one adapter per configured platform.
    ///
    /// Platforms without credentials never reach this point: `AppConfig`
    /// already skipped them (development) or refused to load (production).
    pub fn from_config(config: &AppConfig, cipher: Arc<TokenCipher>) -> OAuthResult<Self> {
        let timeout = Duration::from_secs(config.http.timeout_seconds);
        let mut registry = Self::new();

        for (platform, credentials) in &config.platforms {
            let connector = build_connector(*platform, credentials.clone(), Arc::clone(&cipher), timeout)?;
            registry.register(connector);
        }

        tracing::info!(
            platforms = ?registry.platforms(),
            "Connector registry initialized"
        );
        Ok(registry)
    }

    /// Add or replace the adapter for its platform.
    pub fn register(&mut self, connector: Arc<dyn ContentPublisher>) {
        self.connectors.insert(connector.platform(), connector);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ContentPublisher>> {
        self.connectors.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.connectors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

/// Build the production adapter for `platform`.
pub fn build_connector(
    platform: Platform,
    credentials: PlatformCredentialsConfig,
    cipher: Arc<TokenCipher>,
    timeout: Duration,
) -> OAuthResult<Arc<dyn ContentPublisher>> {
    let client = ProviderClient::new(platform, credentials, cipher, timeout)?;
    let connector: Arc<dyn ContentPublisher> = match platform {
        Platform::Instagram => Arc::new(InstagramConnector::new(client)),
        Platform::Tiktok => Arc::new(TiktokConnector::new(client)),
        Platform::Twitter => Arc::new(TwitterConnector::new(client)),
        Platform::Linkedin => Arc::new(LinkedinConnector::new(client)),
        Platform::Facebook => Arc::new(FacebookConnector::new(client)),
    };
    Ok(connector)
}
