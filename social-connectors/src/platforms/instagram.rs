//! Instagram API with Instagram Login.
//!
//! The code exchange yields a short-lived token (1 hour) that is immediately
//! swapped for a long-lived one (60 days). There are no refresh tokens: the
//! long-lived access token itself is refreshed with `ig_refresh_token`.

use super::endpoint;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use socialink::content::{ensure_max_chars, ContentPublisher, MediaKind, PostContent, PublishedPost};
use socialink::oauth::{
    json_id, json_str, json_u64, OAuthService, Platform, ProviderClient, ProviderProfile,
    RequestKind, TokenSet,
};
use socialink::{OAuthError, OAuthResult};

pub const AUTH_URL: &str = "https://api.instagram.com/oauth/authorize";
pub const TOKEN_BASE_URL: &str = "https://api.instagram.com";
pub const GRAPH_BASE_URL: &str = "https://graph.instagram.com";

pub const MAX_CAPTION_CHARS: usize = 2200;

const PROFILE_FIELDS: &str =
    "user_id,username,name,account_type,profile_picture_url,followers_count,follows_count,media_count";

#[derive(Clone, Debug)]
pub struct InstagramEndpoints {
    pub auth_url: String,
    pub token_base_url: String,
    pub graph_base_url: String,
}

impl Default for InstagramEndpoints {
    fn default() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            token_base_url: TOKEN_BASE_URL.to_string(),
            graph_base_url: GRAPH_BASE_URL.to_string(),
        }
    }
}

pub struct InstagramConnector {
    client: ProviderClient,
    endpoints: InstagramEndpoints,
}

impl InstagramConnector {
    pub fn new(client: ProviderClient) -> Self {
        Self::with_endpoints(client, InstagramEndpoints::default())
    }

    pub fn with_endpoints(client: ProviderClient, endpoints: InstagramEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn with_base_url(client: ProviderClient, base_url: &str) -> Self {
        Self::with_endpoints(
            client,
            InstagramEndpoints {
                auth_url: endpoint(base_url, "/oauth/authorize"),
                token_base_url: base_url.to_string(),
                graph_base_url: base_url.to_string(),
            },
        )
    }

    fn graph(&self, path: &str) -> String {
        endpoint(&self.endpoints.graph_base_url, path)
    }

    /// Swap a short-lived token for a 60 day one.
    async fn exchange_long_lived(&self, short_lived: &str) -> OAuthResult<TokenSet> {
        let request = self.client.http().get(self.graph("/access_token")).query(&[
            ("grant_type", "ig_exchange_token"),
            ("client_secret", self.client.credentials().client_secret.as_str()),
            ("access_token", short_lived),
        ]);

        let value = self.client.send(request).await?;
        self.client.parse_token_set(&value)
    }

    /// Create a media container, then publish it.
    async fn publish_container(&self, access_token: &str, body: Value) -> OAuthResult<String> {
        let request = self
            .client
            .http()
            .post(self.graph("/me/media"))
            .bearer_auth(access_token)
            .json(&body);
        let container = self.client.send(request).await?;
        let creation_id = json_id(&container, "id").ok_or_else(|| self.client.malformed())?;

        let request = self
            .client
            .http()
            .post(self.graph("/me/media_publish"))
            .bearer_auth(access_token)
            .json(&json!({ "creation_id": creation_id }));
        let published = self.client.send(request).await?;
        json_id(&published, "id").ok_or_else(|| self.client.malformed())
    }
}

#[async_trait]
impl OAuthService for InstagramConnector {
    fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn authorization_url(&self, state: &str) -> String {
        self.client
            .build_authorization_url(&self.endpoints.auth_url, "client_id", state, &[])
    }

    async fn exchange_code_for_tokens(&self, code: &str, _state: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        let request = self
            .client
            .http()
            .post(endpoint(&self.endpoints.token_base_url, "/oauth/access_token"))
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("code", code),
            ]);

        let value = self.client.send(request).await?;
        // Newer responses wrap the token in `data: [...]`
        let short = match value.get("data").and_then(Value::as_array).and_then(|d| d.first()) {
            Some(inner) => self.client.parse_token_set(inner)?,
            None => self.client.parse_token_set(&value)?,
        };

        let mut long = self.exchange_long_lived(&short.access_token).await?;
        for (key, extra) in short.extras {
            long.extras.entry(key).or_insert(extra);
        }
        if long.scope.is_none() {
            long.scope = short.scope;
        }
        Ok(long)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet> {
        let request = self
            .client
            .http()
            .get(self.graph("/refresh_access_token"))
            .query(&[("grant_type", "ig_refresh_token"), ("access_token", refresh_token)]);

        let value = self.client.send_as(request, RequestKind::Refresh).await?;
        self.client.parse_token_set(&value)
    }

    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile> {
        let request = self
            .client
            .http()
            .get(self.graph("/me"))
            .query(&[("fields", PROFILE_FIELDS)])
            .bearer_auth(access_token);

        let value = self.client.send(request).await?;
        let id = json_id(&value, "user_id")
            .or_else(|| json_id(&value, "id"))
            .ok_or_else(|| self.client.malformed())?;
        let username = json_str(&value, "username");

        let mut platform_data = Map::new();
        if let Some(account_type) = json_str(&value, "account_type") {
            platform_data.insert("accountType".to_string(), json!(account_type));
        }
        for (field, key) in [("follows_count", "followsCount"), ("media_count", "mediaCount")] {
            if let Some(count) = json_u64(&value, field) {
                platform_data.insert(key.to_string(), json!(count));
            }
        }

        Ok(ProviderProfile {
            id,
            profile_url: username
                .as_ref()
                .map(|u| format!("https://www.instagram.com/{}", u)),
            username,
            display_name: json_str(&value, "name"),
            email: None,
            profile_image: json_str(&value, "profile_picture_url"),
            followers_count: json_u64(&value, "followers_count"),
            platform_data,
        })
    }

    async fn revoke_access(&self, _access_token: &str) {
        // Instagram has no revocation endpoint; the user removes the app from
        // their account settings
        tracing::info!(
            platform = %Platform::Instagram,
            "No upstream revocation endpoint, removing local account only"
        );
    }
}

#[async_trait]
impl ContentPublisher for InstagramConnector {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost> {
        let media = content.first_media().ok_or_else(|| OAuthError::UnsupportedContent {
            platform: Platform::Instagram,
            reason: "Instagram requires an image or video".to_string(),
        })?;
        ensure_max_chars(Platform::Instagram, &content.text, MAX_CAPTION_CHARS)?;

        let body = match media.kind {
            MediaKind::Image => json!({ "image_url": media.url, "caption": content.text }),
            MediaKind::Video => json!({
                "media_type": "REELS",
                "video_url": media.url,
                "caption": content.text,
            }),
        };

        let id = self.publish_container(access_token, body).await?;
        Ok(PublishedPost {
            id,
            url: None,
            platform: Platform::Instagram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::client;
    use mockito::{Matcher, Server};

    fn connector(server: &Server) -> InstagramConnector {
        InstagramConnector::with_base_url(client(Platform::Instagram), &server.url())
    }

    #[test]
    fn test_authorization_url() {
        let url = InstagramConnector::new(client(Platform::Instagram)).authorization_url("s1");
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains(
            "scope=instagram_business_basic%2Cinstagram_business_content_publish"
        ));
        assert!(url.contains("state=s1"));
    }

    #[tokio::test]
    async fn test_exchange_upgrades_to_long_lived_token() {
        let mut server = Server::new_async().await;
        let short = server
            .mock("POST", "/oauth/access_token")
            .match_body(Matcher::UrlEncoded("code".into(), "ig-code".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "short-lived", "user_id": 17841400000000000, "permissions": ["instagram_business_basic"]}"#)
            .create_async()
            .await;
        let long = server
            .mock("GET", "/access_token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "ig_exchange_token".into()),
                Matcher::UrlEncoded("access_token".into(), "short-lived".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "long-lived", "token_type": "bearer", "expires_in": 5183944}"#)
            .create_async()
            .await;

        let tokens = connector(&server)
            .exchange_code_for_tokens("ig-code", "state")
            .await
            .unwrap();

        short.assert_async().await;
        long.assert_async().await;
        assert_eq!(tokens.access_token, "long-lived");
        assert_eq!(tokens.refresh_token, None);
        assert_eq!(tokens.expires_in, Some(5183944));
        assert_eq!(tokens.extras["user_id"], 17841400000000000u64);
    }

    #[tokio::test]
    async fn test_exchange_rejected_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/access_token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error_type": "OAuthException", "code": 400, "error_message": "Invalid authorization code"}"#)
            .create_async()
            .await;

        let err = connector(&server)
            .exchange_code_for_tokens("bad", "state")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::ProviderRejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_refresh_long_lived_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/refresh_access_token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "ig_refresh_token".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "refreshed", "token_type": "bearer", "expires_in": 5184000}"#)
            .create_async()
            .await;

        let tokens = connector(&server).refresh_access_token("long-lived").await.unwrap();
        assert_eq!(tokens.access_token, "refreshed");
    }

    #[tokio::test]
    async fn test_get_user_profile() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/me")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "1",
                    "user_id": "17841400000000000",
                    "username": "studio",
                    "name": "Studio",
                    "account_type": "BUSINESS",
                    "followers_count": 880,
                    "media_count": 41
                }"#,
            )
            .create_async()
            .await;

        let profile = connector(&server).get_user_profile("long-lived").await.unwrap();
        assert_eq!(profile.id, "17841400000000000");
        assert_eq!(profile.profile_url.as_deref(), Some("https://www.instagram.com/studio"));
        assert_eq!(profile.followers_count, Some(880));
        assert_eq!(profile.platform_data["accountType"], "BUSINESS");
        assert_eq!(profile.profile_image, None);
    }

    #[tokio::test]
    async fn test_publish_requires_media() {
        let connector = InstagramConnector::with_base_url(client(Platform::Instagram), "http://127.0.0.1:9");
        let err = connector
            .publish("token", &PostContent::text("caption only"))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::UnsupportedContent { .. }));
    }

    #[tokio::test]
    async fn test_publish_rejects_long_caption() {
        let connector = InstagramConnector::with_base_url(client(Platform::Instagram), "http://127.0.0.1:9");
        let post = PostContent::text("x".repeat(MAX_CAPTION_CHARS + 1))
            .with_media(MediaKind::Image, "https://cdn.example.com/a.jpg");

        let err = connector.publish("token", &post).await.unwrap_err();
        assert!(matches!(err, OAuthError::ContentTooLong { limit: 2200, .. }));
    }

    #[tokio::test]
    async fn test_publish_image() {
        let mut server = Server::new_async().await;
        let _container = server
            .mock("POST", "/me/media")
            .match_body(Matcher::PartialJson(json!({"image_url": "https://cdn.example.com/a.jpg"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "container-1"}"#)
            .create_async()
            .await;
        let _publish = server
            .mock("POST", "/me/media_publish")
            .match_body(Matcher::Json(json!({"creation_id": "container-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "media-99"}"#)
            .create_async()
            .await;

        let post = PostContent::text("new drop").with_media(MediaKind::Image, "https://cdn.example.com/a.jpg");
        let published = connector(&server).publish("token", &post).await.unwrap();
        assert_eq!(published.id, "media-99");
        assert_eq!(published.platform, Platform::Instagram);
    }

    #[tokio::test]
    async fn test_revoke_is_local_only() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        connector(&server).revoke_access("token").await;
        mock.assert_async().await;
    }
}
