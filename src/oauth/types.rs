//! Normalized token and profile shapes returned by every adapter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tokens returned by a code exchange or refresh.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds
    pub expires_in: Option<i64>,

    /// Refresh token lifetime in seconds (TikTok, LinkedIn)
    pub refresh_expires_in: Option<i64>,

    pub scope: Option<String>,

    pub token_type: Option<String>,

    /// Provider-specific fields (TikTok `open_id`, Instagram `user_id`, ...)
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl TokenSet {
    /// Absolute expiry of the access token.
    ///
    /// Negative or out-of-range lifetimes are treated as unknown.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let seconds = self.expires_in.filter(|s| *s >= 0)?;
        now.checked_add_signed(Duration::try_seconds(seconds)?)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// User profile normalized across providers.
///
/// Only `id` is guaranteed. Provider-specific fields go into `platform_data`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
    pub profile_url: Option<String>,
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub platform_data: Map<String, Value>,
}

impl ProviderProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Treat empty or whitespace-only provider strings as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read a string field from a JSON object, treating empty as absent.
pub fn json_str(value: &Value, key: &str) -> Option<String> {
    non_empty(value.get(key).and_then(Value::as_str).map(str::to_string))
}

/// Read a count that providers send either as a number or a numeric string.
pub fn json_u64(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Read an identifier that may be numeric (Instagram, Facebook) or a string.
pub fn json_id(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
