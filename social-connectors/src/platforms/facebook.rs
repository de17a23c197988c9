//! Facebook Login and Graph API adapter.

use super::{endpoint, log_revoke_failure};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use socialink::content::{ensure_max_chars, ContentPublisher, PostContent, PublishedPost};
use socialink::oauth::{
    json_id, json_str, OAuthService, Platform, ProviderClient, ProviderProfile, RequestKind,
    TokenSet,
};
use socialink::{OAuthError, OAuthResult};

pub const GRAPH_VERSION: &str = "v19.0";
pub const DIALOG_BASE_URL: &str = "https://www.facebook.com";
pub const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

pub const MAX_MESSAGE_CHARS: usize = 63206;

#[derive(Clone, Debug)]
pub struct FacebookEndpoints {
    pub dialog_base_url: String,
    pub graph_base_url: String,
}

impl Default for FacebookEndpoints {
    fn default() -> Self {
        Self {
            dialog_base_url: DIALOG_BASE_URL.to_string(),
            graph_base_url: GRAPH_BASE_URL.to_string(),
        }
    }
}

pub struct FacebookConnector {
    client: ProviderClient,
    endpoints: FacebookEndpoints,
}

impl FacebookConnector {
    pub fn new(client: ProviderClient) -> Self {
        Self::with_endpoints(client, FacebookEndpoints::default())
    }

    pub fn with_endpoints(client: ProviderClient, endpoints: FacebookEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn with_base_url(client: ProviderClient, base_url: &str) -> Self {
        Self::with_endpoints(
            client,
            FacebookEndpoints {
                dialog_base_url: base_url.to_string(),
                graph_base_url: base_url.to_string(),
            },
        )
    }

    /// Versioned Graph API URL.
    fn graph(&self, path: &str) -> String {
        endpoint(
            &self.endpoints.graph_base_url,
            &format!("/{}{}", GRAPH_VERSION, path),
        )
    }

    /// Trade any user token for a long-lived one (about 60 days).
    async fn exchange_long_lived(&self, access_token: &str, kind: RequestKind) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        let request = self
            .client
            .http()
            .get(self.graph("/oauth/access_token"))
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("fb_exchange_token", access_token),
            ]);

        let value = self.client.send_as(request, kind).await?;
        self.client.parse_token_set(&value)
    }
}

#[async_trait]
impl OAuthService for FacebookConnector {
    fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn authorization_url(&self, state: &str) -> String {
        let auth_url = endpoint(
            &self.endpoints.dialog_base_url,
            &format!("/{}/dialog/oauth", GRAPH_VERSION),
        );
        self.client
            .build_authorization_url(&auth_url, "client_id", state, &[])
    }

    async fn exchange_code_for_tokens(&self, code: &str, _state: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        let request = self
            .client
            .http()
            .get(self.graph("/oauth/access_token"))
            .query(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("code", code),
            ]);

        let value = self.client.send(request).await?;
        let short = self.client.parse_token_set(&value)?;
        self.exchange_long_lived(&short.access_token, RequestKind::Standard)
            .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet> {
        // No refresh tokens: the current long-lived token is re-exchanged
        self.exchange_long_lived(refresh_token, RequestKind::Refresh)
            .await
    }

    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile> {
        let request = self
            .client
            .http()
            .get(self.graph("/me"))
            .query(&[("fields", "id,name,email,picture,link")])
            .bearer_auth(access_token);

        let value = self.client.send(request).await?;
        let id = json_id(&value, "id").ok_or_else(|| self.client.malformed())?;

        let picture = value.get("picture").and_then(|p| p.get("data"));

        let mut platform_data = Map::new();
        if let Some(silhouette) = picture
            .and_then(|p| p.get("is_silhouette"))
            .and_then(Value::as_bool)
        {
            platform_data.insert("isSilhouette".to_string(), json!(silhouette));
        }

        Ok(ProviderProfile {
            id,
            username: None,
            display_name: json_str(&value, "name"),
            email: json_str(&value, "email"),
            profile_image: picture.and_then(|p| json_str(p, "url")),
            profile_url: json_str(&value, "link"),
            followers_count: None,
            platform_data,
        })
    }

    async fn revoke_access(&self, access_token: &str) {
        let request = self
            .client
            .http()
            .delete(self.graph("/me/permissions"))
            .bearer_auth(access_token);

        match self.client.send(request).await {
            Ok(value) if value.get("success").and_then(Value::as_bool) == Some(false) => {
                log_revoke_failure(&self.client, &self.client.rejected(400, "permissions not removed"))
            }
            Ok(_) => tracing::info!(platform = %Platform::Facebook, "Access revoked"),
            Err(e) => log_revoke_failure(&self.client, &e),
        }
    }
}

#[async_trait]
impl ContentPublisher for FacebookConnector {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost> {
        if !content.media.is_empty() {
            return Err(OAuthError::UnsupportedContent {
                platform: Platform::Facebook,
                reason: "Facebook feed publishing supports text and links only".to_string(),
            });
        }
        ensure_max_chars(Platform::Facebook, &content.text, MAX_MESSAGE_CHARS)?;

        let mut body = json!({ "message": content.text });
        if let Some(link) = &content.link {
            body["link"] = json!(link);
        }

        let request = self
            .client
            .http()
            .post(self.graph("/me/feed"))
            .bearer_auth(access_token)
            .json(&body);

        let value = self.client.send(request).await?;
        let id = json_id(&value, "id").ok_or_else(|| self.client.malformed())?;

        Ok(PublishedPost {
            url: Some(format!("https://www.facebook.com/{}", id)),
            id,
            platform: Platform::Facebook,
        })
    }
}
