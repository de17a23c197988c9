pub mod platform;
pub use platform::PlatformCredentialsConfig;

use crate::credentials::{validate_key, DEFAULT_ALGORITHM};
use crate::error::{OAuthError, OAuthResult};
use crate::oauth::Platform;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Complete service configuration.
///
/// Secrets (encryption key, client credentials) only come from the
/// environment. The optional TOML file carries the non-secret settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub encryption: EncryptionConfig,
    pub oauth: OAuthSettings,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub platforms: BTreeMap<Platform, PlatformCredentialsConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "production" || v == "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Token encryption settings
#[derive(Clone)]
pub struct EncryptionConfig {
    /// Hex-encoded key, at least 64 characters
    pub key: String,
    pub algorithm: String,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// OAuth flow settings
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthSettings {
    /// How long an issued state stays valid (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    /// How often the background sweep drops expired states (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub state_cleanup_interval_seconds: u64,
    /// Application UI that callbacks redirect back to
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

fn default_state_ttl() -> i64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            state_cleanup_interval_seconds: default_cleanup_interval(),
            frontend_url: default_frontend_url(),
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bound on every provider call (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    15
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

/// API server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used to build default redirect URIs
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_port() -> u16 {
    3001
}

fn default_public_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

/// Non-secret settings loadable from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Load non-secret settings from a TOML file
pub fn load_config(path: &str) -> OAuthResult<FileConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        OAuthError::configuration(format!("Failed to read config file {}: {}", path, e))
    })?;
    toml::from_str(&contents)
        .map_err(|e| OAuthError::configuration(format!("Invalid config file {}: {}", path, e)))
}

impl AppConfig {
    /// Build from process environment variables, reading the TOML file named
    /// by `SOCIALINK_CONFIG` first when set.
    pub fn from_env() -> OAuthResult<Self> {
        let file = match std::env::var("SOCIALINK_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => FileConfig::default(),
        };
        Self::from_vars(file, |key| std::env::var(key).ok())
    }

    /// Build from a file config plus an environment lookup.
    ///
    /// Environment values override file values. A missing, short or non-hex
    /// `ENCRYPTION_KEY` is always fatal; missing client credentials are
    /// fatal only in production.
    pub fn from_vars<F>(file: FileConfig, var: F) -> OAuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(var("APP_ENV").as_deref());

        let key = var("ENCRYPTION_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OAuthError::configuration("ENCRYPTION_KEY is required"))?;
        validate_key(&key)?;
        let encryption = EncryptionConfig {
            key,
            algorithm: var("ENCRYPTION_ALGORITHM").unwrap_or_else(|| DEFAULT_ALGORITHM.to_string()),
        };

        let mut oauth = file.oauth;
        if let Some(v) = var("OAUTH_STATE_TTL_SECONDS").and_then(|v| v.parse::<i64>().ok()) {
            oauth.state_ttl_seconds = v;
        }
        if let Some(v) = var("FRONTEND_URL") {
            oauth.frontend_url = v;
        }

        let mut http = file.http;
        if let Some(v) = var("HTTP_TIMEOUT_SECONDS").and_then(|v| v.parse::<u64>().ok()) {
            http.timeout_seconds = v;
        }

        let mut server = file.server;
        if let Some(v) = var("API_PORT").and_then(|v| v.parse::<u16>().ok()) {
            server.port = v;
        }
        if let Some(v) = var("PUBLIC_URL") {
            server.public_url = v;
        }

        let mut platforms = BTreeMap::new();
        for platform in Platform::ALL {
            if let Some(credentials) =
                PlatformCredentialsConfig::from_vars(platform, environment, &server.public_url, &var)?
            {
                platforms.insert(platform, credentials);
            }
        }

        Ok(Self {
            environment,
            encryption,
            oauth,
            http,
            server,
            platforms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(FileConfig::default(), lookup(&[("ENCRYPTION_KEY", KEY)]))
            .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.encryption.algorithm, "aes-256-gcm");
        assert_eq!(config.oauth.state_ttl_seconds, 600);
        assert_eq!(config.http.timeout_seconds, 15);
        assert_eq!(config.server.port, 3001);
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn test_missing_encryption_key_is_fatal() {
        let err = AppConfig::from_vars(FileConfig::default(), lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("ENCRYPTION_KEY"));

        let err = AppConfig::from_vars(FileConfig::default(), lookup(&[("ENCRYPTION_KEY", "abcd")]))
            .unwrap_err();
        assert!(matches!(err, OAuthError::Configuration { .. }));

        let not_hex = "g".repeat(64);
        let err = AppConfig::from_vars(FileConfig::default(), lookup(&[("ENCRYPTION_KEY", &not_hex)]))
            .unwrap_err();
        assert!(err.to_string().contains("hex"));

        let non_ascii = format!("{}é", "a".repeat(63));
        let err = AppConfig::from_vars(FileConfig::default(), lookup(&[("ENCRYPTION_KEY", &non_ascii)]))
            .unwrap_err();
        assert!(matches!(err, OAuthError::Configuration { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_vars(
            FileConfig::default(),
            lookup(&[
                ("ENCRYPTION_KEY", KEY),
                ("OAUTH_STATE_TTL_SECONDS", "900"),
                ("HTTP_TIMEOUT_SECONDS", "5"),
                ("FRONTEND_URL", "https://app.example.com"),
                ("TIKTOK_CLIENT_ID", "tt_key"),
                ("TIKTOK_CLIENT_SECRET", "tt_secret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.oauth.state_ttl_seconds, 900);
        assert_eq!(config.http.timeout_seconds, 5);
        assert_eq!(config.oauth.frontend_url, "https://app.example.com");

        let tiktok = &config.platforms[&Platform::Tiktok];
        assert_eq!(tiktok.client_id, "tt_key");
        assert_eq!(
            tiktok.redirect_uri,
            "http://localhost:3001/api/oauth/tiktok/callback"
        );
        assert_eq!(config.platforms.len(), 1);
    }

    #[test]
    fn test_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [oauth]
            state_ttl_seconds = 300
            frontend_url = "https://dashboard.example.com"

            [http]
            timeout_seconds = 30
            "#
        )
        .unwrap();

        let file_config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(file_config.oauth.state_ttl_seconds, 300);
        assert_eq!(file_config.http.timeout_seconds, 30);
        assert_eq!(file_config.server.port, 3001); // Default

        let config = AppConfig::from_vars(file_config, lookup(&[("ENCRYPTION_KEY", KEY)])).unwrap();
        assert_eq!(config.oauth.frontend_url, "https://dashboard.example.com");
    }

    #[test]
    fn test_missing_config_file() {
        assert!(load_config("/nonexistent/socialink.toml").is_err());
    }
}
