//! Twitter/X OAuth 2.0 (PKCE) and v2 API adapter.

use super::{endpoint, log_revoke_failure};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use socialink::content::{truncate_chars, ContentPublisher, PostContent, PublishedPost};
use socialink::oauth::{
    json_str, json_u64, OAuthService, Platform, ProviderClient, ProviderProfile, RequestKind,
    TokenSet,
};
use socialink::{OAuthError, OAuthResult};

pub const AUTH_URL: &str = "https://twitter.com/i/oauth2/authorize";
pub const API_BASE_URL: &str = "https://api.twitter.com";

/// Tweets longer than this are cut, not rejected
pub const MAX_TWEET_CHARS: usize = 280;

const USER_FIELDS: &str = "profile_image_url,public_metrics,verified,description,created_at";

#[derive(Clone, Debug)]
pub struct TwitterEndpoints {
    pub auth_url: String,
    pub api_base_url: String,
}

impl Default for TwitterEndpoints {
    fn default() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

pub struct TwitterConnector {
    client: ProviderClient,
    endpoints: TwitterEndpoints,
}

impl TwitterConnector {
    pub fn new(client: ProviderClient) -> Self {
        Self::with_endpoints(client, TwitterEndpoints::default())
    }

    pub fn with_endpoints(client: ProviderClient, endpoints: TwitterEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn with_base_url(client: ProviderClient, base_url: &str) -> Self {
        Self::with_endpoints(
            client,
            TwitterEndpoints {
                auth_url: endpoint(base_url, "/i/oauth2/authorize"),
                api_base_url: base_url.to_string(),
            },
        )
    }

    fn api(&self, path: &str) -> String {
        endpoint(&self.endpoints.api_base_url, path)
    }

    /// PKCE verifier bound to one authorization attempt.
    ///
    /// Derived from the client secret and the state so the callback can
    /// rebuild it without storing anything beyond the state itself. The
    /// result is 43 URL-safe characters.
    pub fn code_verifier(&self, state: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.client.credentials().client_secret.as_bytes());
        hasher.update(b":");
        hasher.update(state.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// S256 challenge for a verifier.
    pub fn code_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    async fn token_request(&self, form: &[(&str, &str)], kind: RequestKind) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        // Confidential clients authenticate with HTTP Basic
        let request = self
            .client
            .http()
            .post(self.api("/2/oauth2/token"))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(form);

        let value = self.client.send_as(request, kind).await?;
        self.client.parse_token_set(&value)
    }
}

#[async_trait]
impl OAuthService for TwitterConnector {
    fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn authorization_url(&self, state: &str) -> String {
        let challenge = Self::code_challenge(&self.code_verifier(state));
        self.client.build_authorization_url(
            &self.endpoints.auth_url,
            "client_id",
            state,
            &[
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
    }

    async fn exchange_code_for_tokens(&self, code: &str, state: &str) -> OAuthResult<TokenSet> {
        let verifier = self.code_verifier(state);
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ],
            RequestKind::Standard,
        )
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("client_id", credentials.client_id.as_str()),
            ],
            RequestKind::Refresh,
        )
        .await
    }

    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile> {
        let request = self
            .client
            .http()
            .get(self.api("/2/users/me"))
            .query(&[("user.fields", USER_FIELDS)])
            .bearer_auth(access_token);

        let value = self.client.send(request).await?;
        let user = value.get("data").ok_or_else(|| self.client.malformed())?;
        let id = json_str(user, "id").ok_or_else(|| self.client.malformed())?;
        let username = json_str(user, "username");
        let metrics = user.get("public_metrics").cloned().unwrap_or(Value::Null);

        let mut platform_data = Map::new();
        if let Some(verified) = user.get("verified").and_then(Value::as_bool) {
            platform_data.insert("verified".to_string(), json!(verified));
        }
        if let Some(description) = json_str(user, "description") {
            platform_data.insert("description".to_string(), json!(description));
        }
        for (field, key) in [
            ("following_count", "followingCount"),
            ("tweet_count", "tweetCount"),
            ("listed_count", "listedCount"),
        ] {
            if let Some(count) = json_u64(&metrics, field) {
                platform_data.insert(key.to_string(), json!(count));
            }
        }

        Ok(ProviderProfile {
            id,
            profile_url: username.as_ref().map(|u| format!("https://x.com/{}", u)),
            username,
            display_name: json_str(user, "name"),
            email: None,
            profile_image: json_str(user, "profile_image_url"),
            followers_count: json_u64(&metrics, "followers_count"),
            platform_data,
        })
    }

    async fn revoke_access(&self, access_token: &str) {
        let credentials = self.client.credentials();
        let request = self
            .client
            .http()
            .post(self.api("/2/oauth2/revoke"))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("token", access_token),
                ("token_type_hint", "access_token"),
                ("client_id", credentials.client_id.as_str()),
            ]);

        match self.client.send_expecting_empty(request).await {
            Ok(()) => tracing::info!(platform = %Platform::Twitter, "Access revoked"),
            Err(e) => log_revoke_failure(&self.client, &e),
        }
    }
}

#[async_trait]
impl ContentPublisher for TwitterConnector {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost> {
        // Attaching media needs the v1.1 chunked upload, which this connector does not drive
        if !content.media.is_empty() {
            return Err(OAuthError::UnsupportedContent {
                platform: Platform::Twitter,
                reason: "Twitter publishing supports text and links only".to_string(),
            });
        }

        let mut text = content.text.clone();
        if let Some(link) = &content.link {
            text = format!("{} {}", text, link);
        }
        let text = truncate_chars(text.trim(), MAX_TWEET_CHARS);

        let request = self
            .client
            .http()
            .post(self.api("/2/tweets"))
            .bearer_auth(access_token)
            .json(&json!({ "text": text }));

        let value = self.client.send(request).await?;
        let id = value
            .get("data")
            .and_then(|d| json_str(d, "id"))
            .ok_or_else(|| self.client.malformed())?;

        Ok(PublishedPost {
            url: Some(format!("https://x.com/i/web/status/{}", id)),
            id,
            platform: Platform::Twitter,
        })
    }
}
