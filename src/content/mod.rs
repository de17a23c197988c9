//! Content publishing shared by the platform adapters.

mod insights;

pub use insights::{compute_insights, Insights, VideoStats};

use crate::error::{OAuthError, OAuthResult};
use crate::oauth::{OAuthService, Platform};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Publicly reachable URL the provider pulls the media from
    pub url: String,
}

/// A post to publish on a connected account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub text: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    pub link: Option<String>,
}

impl PostContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, kind: MediaKind, url: impl Into<String>) -> Self {
        self.media.push(MediaItem {
            kind,
            url: url.into(),
        });
        self
    }

    pub fn first_video(&self) -> Option<&MediaItem> {
        self.media.iter().find(|m| m.kind == MediaKind::Video)
    }

    pub fn first_media(&self) -> Option<&MediaItem> {
        self.media.first()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
    pub url: Option<String>,
    pub platform: Platform,
}

/// Publishing capability of a platform adapter.
///
/// Implementations reject content the platform cannot carry before making
/// any network call.
#[async_trait]
pub trait ContentPublisher: OAuthService {
    async fn publish(&self, access_token: &str, content: &PostContent) -> OAuthResult<PublishedPost>;
}

/// Fail when `text` is longer than `limit` characters.
pub fn ensure_max_chars(platform: Platform, text: &str, limit: usize) -> OAuthResult<()> {
    let actual = text.chars().count();
    if actual > limit {
        return Err(OAuthError::ContentTooLong {
            platform,
            limit,
            actual,
        });
    }
    Ok(())
}

/// Cut `text` to at most `limit` characters, ending with `…` when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
