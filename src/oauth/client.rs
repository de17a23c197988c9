//! Shared HTTP plumbing for platform adapters.
//!
//! Every adapter owns a [`ProviderClient`]. It builds authorization URLs,
//! sends token and API requests with a bounded timeout, and normalizes
//! provider failures into [`OAuthError`]. Adapters never see raw
//! `reqwest` or `serde_json` errors.

use super::{Platform, TokenSet};
use crate::config::PlatformCredentialsConfig;
use crate::credentials::TokenCipher;
use crate::error::{OAuthError, OAuthResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Longest provider message carried into an error
const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// Default bound on every provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Token response fields that map onto [`TokenSet`] directly.
const STANDARD_TOKEN_FIELDS: &[&str] = &[
    "access_token",
    "refresh_token",
    "expires_in",
    "refresh_expires_in",
    "refresh_token_expires_in",
    "scope",
    "token_type",
];

/// Distinguishes refresh calls so a dead refresh token maps to 401.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Standard,
    Refresh,
}

/// HTTP client bound to one platform registration.
#[derive(Clone, Debug)]
pub struct ProviderClient {
    platform: Platform,
    credentials: PlatformCredentialsConfig,
    http: Client,
    cipher: Arc<TokenCipher>,
}

impl ProviderClient {
    pub fn new(
        platform: Platform,
        credentials: PlatformCredentialsConfig,
        cipher: Arc<TokenCipher>,
        timeout: Duration,
    ) -> OAuthResult<Self> {
        let http = Client::builder()
            .user_agent("socialink/0.1")
            .timeout(timeout)
            .build()
            .map_err(|_| OAuthError::configuration("Failed to build HTTP client"))?;

        Ok(Self {
            platform,
            credentials,
            http,
            cipher,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn credentials(&self) -> &PlatformCredentialsConfig {
        &self.credentials
    }

    pub fn cipher(&self) -> &TokenCipher {
        &self.cipher
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Scopes joined with the platform's separator.
    pub fn scope_string(&self) -> String {
        self.credentials
            .scope
            .join(self.platform.scope_separator())
    }

    /// Build an authorization URL with every value URL-encoded.
    ///
    /// `client_id_param` is `client_id` for most providers (`client_key` for TikTok).
    pub fn build_authorization_url(
        &self,
        auth_url: &str,
        client_id_param: &str,
        state: &str,
        extra: &[(&str, &str)],
    ) -> String {
        let scope = self.scope_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            (client_id_param, self.credentials.client_id.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        params.extend_from_slice(extra);

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", auth_url, query)
    }

    /// Send a request and parse the JSON body.
    pub async fn send(&self, request: RequestBuilder) -> OAuthResult<Value> {
        self.send_as(request, RequestKind::Standard).await
    }

    /// Send a request, treating an empty 2xx body as success.
    pub async fn send_expecting_empty(&self, request: RequestBuilder) -> OAuthResult<()> {
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            return Err(self.error_from_response(status, &body, RequestKind::Standard));
        }
        Ok(())
    }

    pub async fn send_as(&self, request: RequestBuilder, kind: RequestKind) -> OAuthResult<Value> {
        let (status, body) = self.execute(request).await?;

        if !status.is_success() {
            return Err(self.error_from_response(status, &body, kind));
        }

        if body.trim().is_empty() {
            tracing::warn!(platform = %self.platform, status = status.as_u16(), "Empty provider response");
            return Err(self.malformed());
        }

        serde_json::from_str(&body).map_err(|_| {
            tracing::warn!(platform = %self.platform, "Provider response is not valid JSON");
            self.malformed()
        })
    }

    async fn execute(&self, request: RequestBuilder) -> OAuthResult<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok((status, body))
    }

    /// Map a transport failure to a retryable error.
    ///
    /// The request URL is stripped before logging: some providers carry
    /// tokens in the query string.
    pub fn transport_error(&self, error: reqwest::Error) -> OAuthError {
        let message = if error.is_timeout() {
            "request timed out"
        } else if error.is_connect() {
            "connection failed"
        } else if error.is_decode() || error.is_body() {
            "failed to read response"
        } else {
            "network error"
        };

        tracing::warn!(
            platform = %self.platform,
            error = %error.without_url(),
            "Provider request failed"
        );

        OAuthError::ProviderUnavailable {
            platform: self.platform,
            message: message.to_string(),
        }
    }

    /// Map a non-2xx response to the normalized taxonomy.
    pub fn error_from_response(&self, status: StatusCode, body: &str, kind: RequestKind) -> OAuthError {
        let envelope: Option<Value> = serde_json::from_str(body).ok();
        let message = envelope
            .as_ref()
            .and_then(extract_error_message)
            .map(|m| self.sanitize(&m))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(platform = %self.platform, status = status.as_u16(), "Provider unavailable");
            return OAuthError::ProviderUnavailable {
                platform: self.platform,
                message,
            };
        }

        let invalid_grant = envelope
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .map(|code| code == "invalid_grant")
            .unwrap_or(false);

        // Graph API reports dead tokens as 400 with error code 190
        let graph_token_invalid = envelope
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|e| e.get("code"))
            .and_then(Value::as_i64)
            == Some(190);

        let status = match kind {
            RequestKind::Refresh if invalid_grant => StatusCode::UNAUTHORIZED.as_u16(),
            _ if graph_token_invalid => StatusCode::UNAUTHORIZED.as_u16(),
            _ => status.as_u16(),
        };

        tracing::warn!(platform = %self.platform, status, "Provider rejected request");
        self.rejected(status, message)
    }

    pub fn rejected(&self, status: u16, message: impl Into<String>) -> OAuthError {
        OAuthError::ProviderRejected {
            platform: self.platform,
            status,
            message: self.sanitize(&message.into()),
        }
    }

    pub fn malformed(&self) -> OAuthError {
        OAuthError::MalformedResponse {
            platform: self.platform,
        }
    }

    /// Truncate and scrub a provider message before it enters an error.
    fn sanitize(&self, message: &str) -> String {
        let mut clean = message.trim().to_string();
        if !self.credentials.client_secret.is_empty() {
            clean = clean.replace(&self.credentials.client_secret, "[REDACTED]");
        }
        if clean.chars().count() > MAX_ERROR_MESSAGE_LEN {
            clean = clean.chars().take(MAX_ERROR_MESSAGE_LEN).collect::<String>() + "…";
        }
        clean
    }

    /// Parse a standard OAuth token response.
    ///
    /// Non-standard fields are kept in [`TokenSet::extras`].
    pub fn parse_token_set(&self, value: &Value) -> OAuthResult<TokenSet> {
        let access_token = value
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::warn!(platform = %self.platform, "Token response without access_token");
                self.malformed()
            })?
            .to_string();

        let seconds = |key: &str| match value.get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };

        let scope = match value.get("scope") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(self.platform.scope_separator()),
            ),
            _ => None,
        };

        let extras: Map<String, Value> = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(k, _)| !STANDARD_TOKEN_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(TokenSet {
            access_token,
            refresh_token: value
                .get("refresh_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            expires_in: seconds("expires_in"),
            refresh_expires_in: seconds("refresh_expires_in")
                .or_else(|| seconds("refresh_token_expires_in")),
            scope,
            token_type: value
                .get("token_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            extras,
        })
    }
}

/// Pull a human-readable message out of the provider error envelopes seen in
/// the wild:
///
/// - `{"error": {"message": "..."}}` (Graph API, TikTok)
/// - `{"error": "...", "error_description": "..."}` (RFC 6749)
/// - `{"title": "...", "detail": "..."}` (Twitter v2)
/// - `{"errors": [{"message": "..."}]}` (Twitter v1.1)
/// - `{"message": "..."}` (LinkedIn REST)
pub fn extract_error_message(body: &Value) -> Option<String> {
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    text(body.get("error").and_then(|e| e.get("message")))
        .or_else(|| text(body.get("error_description")))
        .or_else(|| text(body.get("detail")))
        .or_else(|| {
            text(
                body.get("errors")
                    .and_then(Value::as_array)
                    .and_then(|errors| errors.first())
                    .and_then(|e| e.get("message")),
            )
        })
        .or_else(|| text(body.get("message")))
        .or_else(|| text(body.get("error")))
}
