use super::Environment;
use crate::error::{OAuthError, OAuthResult};
use crate::oauth::Platform;
use serde::Deserialize;

/// Client registration for one platform. Immutable once an adapter is built.
#[derive(Clone, Deserialize)]
pub struct PlatformCredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: Vec<String>,
}

impl std::fmt::Debug for PlatformCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .finish()
    }
}

impl PlatformCredentialsConfig {
    /// Credentials with the platform's default scopes.
    pub fn new(
        platform: Platform,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: platform
                .default_scopes()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Reads `<PLATFORM>_CLIENT_ID`, `_CLIENT_SECRET`, `_REDIRECT_URI` and
    /// optional `_SCOPES`.
    ///
    /// Returns `Ok(None)` when the platform is not configured outside
    /// production. In production any missing value is a configuration error.
    pub(crate) fn from_vars<F>(
        platform: Platform,
        environment: Environment,
        public_url: &str,
        var: &F,
    ) -> OAuthResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = platform.env_prefix();
        let read = |suffix: &str| {
            var(&format!("{}_{}", prefix, suffix)).filter(|v| !v.trim().is_empty())
        };

        let client_id = read("CLIENT_ID");
        let client_secret = read("CLIENT_SECRET");
        let redirect_uri = read("REDIRECT_URI");

        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            (None, None) if !environment.is_production() => {
                tracing::debug!(platform = %platform, "Platform not configured, skipping");
                return Ok(None);
            }
            _ if !environment.is_production() => {
                tracing::warn!(
                    platform = %platform,
                    "Incomplete client credentials ({}_CLIENT_ID / {}_CLIENT_SECRET), skipping",
                    prefix,
                    prefix
                );
                return Ok(None);
            }
            _ => {
                return Err(OAuthError::configuration(format!(
                    "{}_CLIENT_ID and {}_CLIENT_SECRET are required in production",
                    prefix, prefix
                )))
            }
        };

        let redirect_uri = match redirect_uri {
            Some(uri) => uri,
            None if environment.is_production() => {
                return Err(OAuthError::configuration(format!(
                    "{}_REDIRECT_URI is required in production",
                    prefix
                )))
            }
            None => format!(
                "{}/api/oauth/{}/callback",
                public_url.trim_end_matches('/'),
                platform
            ),
        };

        let mut config = Self::new(platform, client_id, client_secret, redirect_uri);
        if let Some(scopes) = read("SCOPES") {
            config.scope = scopes
                .split([',', ' '])
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_production_requires_credentials() {
        let env = vars(&[("LINKEDIN_CLIENT_ID", "id")]);
        let result = PlatformCredentialsConfig::from_vars(
            Platform::Linkedin,
            Environment::Production,
            "https://api.example.com",
            &|k: &str| env.get(k).cloned(),
        );
        assert!(matches!(result, Err(OAuthError::Configuration { .. })));
    }

    #[test]
    fn test_production_requires_redirect_uri() {
        let env = vars(&[("LINKEDIN_CLIENT_ID", "id"), ("LINKEDIN_CLIENT_SECRET", "secret")]);
        let result = PlatformCredentialsConfig::from_vars(
            Platform::Linkedin,
            Environment::Production,
            "https://api.example.com",
            &|k: &str| env.get(k).cloned(),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("LINKEDIN_REDIRECT_URI"));
    }

    #[test]
    fn test_development_skips_incomplete() {
        let env = vars(&[("FACEBOOK_CLIENT_ID", "id")]);
        let result = PlatformCredentialsConfig::from_vars(
            Platform::Facebook,
            Environment::Development,
            "http://localhost:3001",
            &|k: &str| env.get(k).cloned(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_scope_override() {
        let env = vars(&[
            ("TWITTER_CLIENT_ID", "id"),
            ("TWITTER_CLIENT_SECRET", "secret"),
            ("TWITTER_SCOPES", "tweet.read users.read"),
        ]);
        let config = PlatformCredentialsConfig::from_vars(
            Platform::Twitter,
            Environment::Development,
            "http://localhost:3001/",
            &|k: &str| env.get(k).cloned(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(config.scope, vec!["tweet.read", "users.read"]);
        assert_eq!(
            config.redirect_uri,
            "http://localhost:3001/api/oauth/twitter/callback"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = PlatformCredentialsConfig::new(
            Platform::Tiktok,
            "client",
            "super-secret",
            "https://example.com/cb",
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("client"));
    }
}
