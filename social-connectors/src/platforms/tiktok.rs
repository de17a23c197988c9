//! TikTok Login Kit and Content Posting API adapter.

use super::{endpoint, log_revoke_failure};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use socialink::content::{
    compute_insights, ensure_max_chars, ContentPublisher, Insights, PostContent, PublishedPost,
    VideoStats,
};
use socialink::oauth::{
    json_str, json_u64, OAuthService, Platform, ProviderClient, ProviderProfile, RequestKind,
    TokenSet,
};
use socialink::{OAuthError, OAuthResult};

pub const AUTH_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";
pub const API_BASE_URL: &str = "https://open.tiktokapis.com";

const USER_FIELDS: &str = "open_id,union_id,avatar_url,display_name,username,profile_deep_link,bio_description,is_verified,follower_count,following_count,likes_count,video_count";
const VIDEO_FIELDS: &str = "id,title,view_count,like_count,comment_count,share_count,create_time";

/// Maximum length of a video title/caption
pub const MAX_TITLE_CHARS: usize = 2200;

/// Videos fetched per insights request
const VIDEO_PAGE_SIZE: u32 = 20;

/// TikTok endpoints (overridable for tests)
#[derive(Clone, Debug)]
pub struct TiktokEndpoints {
    pub auth_url: String,
    pub api_base_url: String,
}

impl Default for TiktokEndpoints {
    fn default() -> Self {
        Self {
            auth_url: AUTH_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

/// One video from the video list endpoint.
#[derive(Debug, Deserialize)]
pub struct TiktokVideo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub create_time: Option<i64>,
}

impl From<&TiktokVideo> for VideoStats {
    fn from(video: &TiktokVideo) -> Self {
        VideoStats {
            views: video.view_count,
            likes: video.like_count,
            comments: video.comment_count,
            shares: video.share_count,
        }
    }
}

pub struct TiktokConnector {
    client: ProviderClient,
    endpoints: TiktokEndpoints,
}

impl TiktokConnector {
    pub fn new(client: ProviderClient) -> Self {
        Self::with_endpoints(client, TiktokEndpoints::default())
    }

    pub fn with_endpoints(client: ProviderClient, endpoints: TiktokEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Point every endpoint at `base_url` (for testing with a mock server).
    pub fn with_base_url(client: ProviderClient, base_url: &str) -> Self {
        Self::with_endpoints(
            client,
            TiktokEndpoints {
                auth_url: endpoint(base_url, "/v2/auth/authorize/"),
                api_base_url: base_url.to_string(),
            },
        )
    }

    fn api(&self, path: &str) -> String {
        endpoint(&self.endpoints.api_base_url, path)
    }

    /// Token endpoints answer 200 with `{"error": "...", "error_description": "..."}`
    /// on failure.
    fn check_oauth_error(&self, value: &Value, kind: RequestKind) -> OAuthResult<()> {
        let Some(code) = value.get("error").and_then(Value::as_str).filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let message = json_str(value, "error_description").unwrap_or_else(|| code.to_string());
        let status = match (kind, code) {
            (RequestKind::Refresh, "invalid_grant") => 401,
            (_, "invalid_client") => 401,
            _ => 400,
        };
        Err(self.client.rejected(status, message))
    }

    /// API endpoints wrap every response in `{"data": ..., "error": {"code": "ok"}}`.
    fn check_api_error(&self, value: &Value) -> OAuthResult<()> {
        let Some(error) = value.get("error").filter(|e| e.is_object()) else {
            return Ok(());
        };
        let code = error.get("code").and_then(Value::as_str).unwrap_or("ok");
        if code == "ok" {
            return Ok(());
        }

        let message = json_str(error, "message").unwrap_or_else(|| code.to_string());
        match code {
            "access_token_invalid" => Err(self.client.rejected(401, message)),
            "scope_not_authorized" | "scope_permission_missed" => Err(self.client.rejected(403, message)),
            "rate_limit_exceeded" => Err(OAuthError::ProviderUnavailable {
                platform: Platform::Tiktok,
                message,
            }),
            _ => Err(self.client.rejected(400, message)),
        }
    }

    async fn token_request(&self, form: &[(&str, &str)], kind: RequestKind) -> OAuthResult<TokenSet> {
        let request = self
            .client
            .http()
            .post(self.api("/v2/oauth/token/"))
            .header("Cache-Control", "no-cache")
            .form(form);

        let value = self.client.send_as(request, kind).await?;
        self.check_oauth_error(&value, kind)?;
        self.client.parse_token_set(&value)
    }

    /// Fetch the most recent videos of the authorized account.
    pub async fn list_videos(&self, access_token: &str, max_count: u32) -> OAuthResult<Vec<TiktokVideo>> {
        let request = self
            .client
            .http()
            .post(self.api("/v2/video/list/"))
            .query(&[("fields", VIDEO_FIELDS)])
            .bearer_auth(access_token)
            .json(&json!({ "max_count": max_count }));

        let value = self.client.send(request).await?;
        self.check_api_error(&value)?;

        let videos = value
            .get("data")
            .and_then(|d| d.get("videos"))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        serde_json::from_value(videos).map_err(|_| self.client.malformed())
    }

    /// Aggregate views and interactions across recent videos.
    pub async fn get_insights(&self, access_token: &str) -> OAuthResult<Insights> {
        let videos = self.list_videos(access_token, VIDEO_PAGE_SIZE).await?;
        let stats: Vec<VideoStats> = videos.iter().map(VideoStats::from).collect();
        Ok(compute_insights(&stats))
    }
}

#[async_trait]
impl OAuthService for TiktokConnector {
    fn client(&self) -> &ProviderClient {
        &self.client
    }

    fn authorization_url(&self, state: &str) -> String {
        // TikTok names the client id `client_key`
        self.client
            .build_authorization_url(&self.endpoints.auth_url, "client_key", state, &[])
    }

    async fn exchange_code_for_tokens(&self, code: &str, _state: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("client_key", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ],
            RequestKind::Standard,
        )
        .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet> {
        let credentials = self.client.credentials();
        self.token_request(
            &[
                ("client_key", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            RequestKind::Refresh,
        )
        .await
    }

    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile> {
        let request = self
            .client
            .http()
            .get(self.api("/v2/user/info/"))
            .query(&[("fields", USER_FIELDS)])
            .bearer_auth(access_token);

        let value = self.client.send(request).await?;
        self.check_api_error(&value)?;

        let user = value
            .get("data")
            .and_then(|d| d.get("user"))
            .ok_or_else(|| self.client.malformed())?;
        let open_id = json_str(user, "open_id").ok_or_else(|| self.client.malformed())?;

        let mut platform_data = Map::new();
        platform_data.insert("openId".to_string(), json!(open_id));
        if let Some(union_id) = json_str(user, "union_id") {
            platform_data.insert("unionId".to_string(), json!(union_id));
        }
        if let Some(verified) = user.get("is_verified").and_then(Value::as_bool) {
            platform_data.insert("isVerified".to_string(), json!(verified));
        }
        if let Some(bio) = json_str(user, "bio_description") {
            platform_data.insert("bio".to_string(), json!(bio));
        }
        for (field, key) in [
            ("following_count", "followingCount"),
            ("likes_count", "likesCount"),
            ("video_count", "videoCount"),
        ] {
            if let Some(count) = json_u64(user, field) {
                platform_data.insert(key.to_string(), json!(count));
            }
        }

        Ok(ProviderProfile {
            id: open_id,
            username: json_str(user, "username"),
            display_name: json_str(user, "display_name"),
            email: None,
            profile_image: json_str(user, "avatar_url"),
            profile_url: json_str(user, "profile_deep_link"),
            followers_count: json_u64(user, "follower_count"),
            platform_data,
        })
    }

    async fn revoke_access(&self, access_token: &str) {
        let credentials = self.client.credentials();
        let request = self.client.http().post(self.api("/v2/oauth/revoke/")).form(&[
            ("client_key", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("token", access_token),
        ]);

        match self.client.send_expecting_empty(request).await {
            Ok(()) => tracing::info!(platform = %Platform::Tiktok, "Access revoked"),
            Err(e) => log_revoke_failure(&self.client, &e),
        }
    }
}

#[async_trait]
impl ContentPublisher for TiktokConnector {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost> {
        let video = content.first_video().ok_or_else(|| OAuthError::UnsupportedContent {
            platform: Platform::Tiktok,
            reason: "TikTok requires video content".to_string(),
        })?;
        ensure_max_chars(Platform::Tiktok, &content.text, MAX_TITLE_CHARS)?;

        let request = self
            .client
            .http()
            .post(self.api("/v2/post/publish/video/init/"))
            .bearer_auth(access_token)
            .json(&json!({
                "post_info": {
                    "title": content.text,
                    "privacy_level": "PUBLIC_TO_EVERYONE",
                },
                "source_info": {
                    "source": "PULL_FROM_URL",
                    "video_url": video.url,
                },
            }));

        let value = self.client.send(request).await?;
        self.check_api_error(&value)?;

        let publish_id = value
            .get("data")
            .and_then(|d| json_str(d, "publish_id"))
            .ok_or_else(|| self.client.malformed())?;

        tracing::info!(platform = %Platform::Tiktok, "Video publish initiated");
        Ok(PublishedPost {
            id: publish_id,
            url: None,
            platform: Platform::Tiktok,
        })
    }
}
