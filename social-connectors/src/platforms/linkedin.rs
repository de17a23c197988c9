//! LinkedIn (Sign In with LinkedIn using OpenID Connect, Share on LinkedIn).

use super::{endpoint, log_revoke_failure};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use socialink::content::{ensure_max_chars, ContentPublisher, PostContent, PublishedPost};
use socialink::oauth::{
    json_str, OAuthService, Platform, ProviderClient, ProviderProfile, RequestKind, TokenSet,
};
use socialink::{OAuthError, OAuthResult};

pub const OAUTH_BASE_URL: &str = "https://www.linkedin.com";
pub const API_BASE_URL: &str = "https://api.linkedin.com";

pub const MAX_COMMENTARY_CHARS: usize = 3000;

#[derive(Clone, Debug)]
pub struct LinkedinEndpoints {
    pub oauth_base_url: String,
    pub api_base_url: String,
}

impl Default for LinkedinEndpoints {
    fn default() -> Self {
        Self {
            oauth_base_url: OAUTH_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

pub struct LinkedinConnector {
    client: ProviderClient,
    endpoints: LinkedinEndpoints,
}

impl LinkedinConnector {
    pub fn new(client: ProviderClient) -> Self {
        Self::with_endpoints(client, LinkedinEndpoints::default())
    }

    pub fn with_endpoints(client: ProviderClient, endpoints: LinkedinEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn with_base_url(client: ProviderClient, base_url: &str) -> Self {
        Self::with_endpoints(
            client,
            LinkedinEndpoints {
                oauth_base_url: base_url.to_string(),
                api_base_url: base_url.to_string(),
            },
        )
    }

    fn oauth(&self, path: &str) -> String {
        endpoint(&self.endpoints.oauth_base_url, path)
    }

    fn api(&self, path: &str) -> String {
        endpoint(&self.endpoints.api_base_url, path)
    }

    async fn token_request(&self, form: &[(&str, &str)], kind: RequestKind) -> OAuthResult<TokenSet> {
        let request = self
            .client
            .http()
            .post(self.oauth("/oauth/v2/accessToken"))
            .form(form);

        let value = self.client.send_as(request, kind).await?;
        self.client.parse_token_set(&value)
    }
}

#[async_trait]
impl OAuthService for LinkedinConnector {
    fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn authorization_url(&self, state: &str) -> String {
        self.client.build_authorization_url(
            &self.oauth("/oauth/v2/authorization"),
            "client_id",
            state,
            &[],
        )
    }

    async fn exchange_code_for_tokens(&self, code: &str, _state: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ],
            RequestKind::Standard,
        )
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ],
            RequestKind::Refresh,
        )
        .await
    }

    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile> {
        let request = self
            .client
            .http()
            .get(self.api("/v2/userinfo"))
            .bearer_auth(access_token);

        let value = self.client.send(request).await?;
        let id = json_str(&value, "sub").ok_or_else(|| self.client.malformed())?;

        let mut platform_data = Map::new();
        for (field, key) in [("given_name", "givenName"), ("family_name", "familyName")] {
            if let Some(name) = json_str(&value, field) {
                platform_data.insert(key.to_string(), json!(name));
            }
        }
        if let Some(verified) = value.get("email_verified").and_then(Value::as_bool) {
            platform_data.insert("emailVerified".to_string(), json!(verified));
        }
        if let Some(locale) = value.get("locale").filter(|l| !l.is_null()) {
            platform_data.insert("locale".to_string(), locale.clone());
        }

        Ok(ProviderProfile {
            id,
            username: None,
            display_name: json_str(&value, "name"),
            email: json_str(&value, "email"),
            profile_image: json_str(&value, "picture"),
            profile_url: None,
            followers_count: None,
            platform_data,
        })
    }

    async fn revoke_access(&self, access_token: &str) {
        let credentials = self.client.credentials();
        let request = self.client.http().post(self.oauth("/oauth/v2/revoke")).form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("token", access_token),
        ]);

        match self.client.send_expecting_empty(request).await {
            Ok(()) => tracing::info!(platform = %Platform::Linkedin, "Access revoked"),
            Err(e) => log_revoke_failure(&self.client, &e),
        }
    }
}

#[async_trait]
impl ContentPublisher for LinkedinConnector {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost> {
        // Media needs the asset upload API, which this connector does not drive
        if !content.media.is_empty() {
            return Err(OAuthError::UnsupportedContent {
                platform: Platform::Linkedin,
                reason: "LinkedIn publishing supports text and links only".to_string(),
            });
        }
        ensure_max_chars(Platform::Linkedin, &content.text, MAX_COMMENTARY_CHARS)?;

        let profile = self.get_user_profile(access_token).await?;
        let (category, media) = match &content.link {
            Some(link) => ("ARTICLE", json!([{ "status": "READY", "originalUrl": link }])),
            None => ("NONE", json!([])),
        };

        let request = self
            .client
            .http()
            .post(self.api("/v2/ugcPosts"))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&json!({
                "author": format!("urn:li:person:{}", profile.id),
                "lifecycleState": "PUBLISHED",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": { "text": content.text },
                        "shareMediaCategory": category,
                        "media": media,
                    }
                },
                "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
            }));

        let value = self.client.send(request).await?;
        let id = json_str(&value, "id").ok_or_else(|| self.client.malformed())?;

        Ok(PublishedPost {
            url: Some(format!("https://www.linkedin.com/feed/update/{}", id)),
            id,
            platform: Platform::Linkedin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::client;
    use mockito::{Matcher, Server};

    fn connector(server: &Server) -> LinkedinConnector {
        LinkedinConnector::with_base_url(client(Platform::Linkedin), &server.url())
    }

    async fn mock_userinfo(server: &mut Server) -> mockito::Mock {
        server
            .mock("GET", "/v2/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "sub": "782bbtaQ",
                    "name": "Ada Lovelace",
                    "given_name": "Ada",
                    "family_name": "Lovelace",
                    "picture": "https://media.licdn.com/dms/image/ada.jpg",
                    "locale": {"country": "US", "language": "en"},
                    "email": "ada@example.com",
                    "email_verified": true
                }"#,
            )
            .create_async()
            .await
    }

    #[test]
    fn test_authorization_url() {
        let url = LinkedinConnector::new(client(Platform::Linkedin)).authorization_url("s");
        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(url.contains("scope=openid%20profile%20email%20w_member_social"));
    }

    #[tokio::test]
    async fn test_exchange_code_for_tokens() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/v2/accessToken")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("client_secret".into(), "test_client_secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "access_token": "li-access",
                    "expires_in": 5184000,
                    "refresh_token": "li-refresh",
                    "refresh_token_expires_in": 31536000,
                    "scope": "email,openid,profile,w_member_social",
                    "id_token": "eyJ..."
                }"#,
            )
            .create_async()
            .await;

        let tokens = connector(&server)
            .exchange_code_for_tokens("li-code", "state")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "li-access");
        assert_eq!(tokens.refresh_expires_in, Some(31536000));
        assert!(tokens.extras.contains_key("id_token"));
    }

    #[tokio::test]
    async fn test_get_user_profile() {
        let mut server = Server::new_async().await;
        let _mock = mock_userinfo(&mut server).await;

        let profile = connector(&server).get_user_profile("li-access").await.unwrap();
        assert_eq!(profile.id, "782bbtaQ");
        assert_eq!(profile.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.platform_data["givenName"], "Ada");
        assert_eq!(profile.platform_data["emailVerified"], true);
        assert_eq!(profile.platform_data["locale"]["country"], "US");
    }

    #[tokio::test]
    async fn test_get_user_profile_without_sub_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "No Id"}"#)
            .create_async()
            .await;

        let err = connector(&server).get_user_profile("li-access").await.unwrap_err();
        assert!(matches!(err, OAuthError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_publish_text_post() {
        let mut server = Server::new_async().await;
        let _userinfo = mock_userinfo(&mut server).await;
        let _post = server
            .mock("POST", "/v2/ugcPosts")
            .match_header("x-restli-protocol-version", "2.0.0")
            .match_body(Matcher::PartialJson(json!({
                "author": "urn:li:person:782bbtaQ",
                "lifecycleState": "PUBLISHED"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "urn:li:share:6844785523593134080"}"#)
            .create_async()
            .await;

        let published = connector(&server)
            .publish("li-access", &PostContent::text("Hiring!"))
            .await
            .unwrap();
        assert_eq!(published.id, "urn:li:share:6844785523593134080");
        assert_eq!(
            published.url.as_deref(),
            Some("https://www.linkedin.com/feed/update/urn:li:share:6844785523593134080")
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_long_text() {
        let connector = LinkedinConnector::with_base_url(client(Platform::Linkedin), "http://127.0.0.1:9");
        let err = connector
            .publish("li-access", &PostContent::text("a".repeat(3001)))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::ContentTooLong { limit: 3000, actual: 3001, .. }));
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_revoke_failure_is_swallowed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/v2/revoke")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid_request", "error_description": "token already revoked"}"#)
            .create_async()
            .await;

        connector(&server).revoke_access("li-access").await;
        mock.assert_async().await;
    }
}
