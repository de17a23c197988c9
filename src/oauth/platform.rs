//! Supported social platforms and their OAuth defaults.

use crate::error::OAuthError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Twitter,
    Linkedin,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Facebook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Tiktok => "TikTok",
            Platform::Twitter => "Twitter",
            Platform::Linkedin => "LinkedIn",
            Platform::Facebook => "Facebook",
        }
    }

    /// Prefix of the platform's environment variables (`TIKTOK_CLIENT_ID`, ...).
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Platform::Instagram => "INSTAGRAM",
            Platform::Tiktok => "TIKTOK",
            Platform::Twitter => "TWITTER",
            Platform::Linkedin => "LINKEDIN",
            Platform::Facebook => "FACEBOOK",
        }
    }

    /// Scopes requested when the configuration does not override them.
    pub fn default_scopes(&self) -> &'static [&'static str] {
        match self {
            Platform::Instagram => &[
                "instagram_business_basic",
                "instagram_business_content_publish",
                "instagram_business_manage_insights",
            ],
            Platform::Tiktok => &[
                "user.info.basic",
                "user.info.profile",
                "user.info.stats",
                "video.list",
                "video.publish",
            ],
            Platform::Twitter => &["tweet.read", "tweet.write", "users.read", "offline.access"],
            Platform::Linkedin => &["openid", "profile", "email", "w_member_social"],
            Platform::Facebook => &[
                "public_profile",
                "email",
                "pages_manage_posts",
                "pages_read_engagement",
            ],
        }
    }

    /// Separator used to join scopes in the authorization URL.
    pub fn scope_separator(&self) -> &'static str {
        match self {
            Platform::Instagram | Platform::Tiktok | Platform::Facebook => ",",
            Platform::Twitter | Platform::Linkedin => " ",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "facebook" => Ok(Platform::Facebook),
            _ => Err(OAuthError::invalid_request(format!("Unknown platform '{}'", s))),
        }
    }
}
