//! Normalized error taxonomy for the OAuth layer.
//!
//! Adapters translate every provider, network and cipher failure into
//! [`OAuthError`]. Nothing upstream of an adapter sees a raw `reqwest`,
//! `serde_json` or `aes-gcm` error.

use crate::oauth::Platform;
use thiserror::Error;

/// Message used for every decryption failure.
pub const DECRYPTION_FAILED: &str = "Failed to decrypt data";

#[derive(Debug, Error)]
pub enum OAuthError {
    /// Fatal startup problem (missing/short encryption key, missing client credentials).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("Invalid OAuth request: {reason}")]
    InvalidRequest { reason: String },

    /// Definitive 4xx rejection (bad code, revoked token, insufficient scope).
    #[error("{platform} rejected the request (HTTP {status}): {message}")]
    ProviderRejected {
        platform: Platform,
        status: u16,
        message: String,
    },

    /// 5xx, timeout or connection failure. Safe to retry.
    #[error("{platform} is unavailable: {message}")]
    ProviderUnavailable { platform: Platform, message: String },

    #[error("{platform} returned a malformed response")]
    MalformedResponse { platform: Platform },

    #[error("{}", DECRYPTION_FAILED)]
    Decryption,

    #[error("{reason}")]
    UnsupportedContent { platform: Platform, reason: String },

    #[error("{platform} content exceeds {limit} characters (got {actual})")]
    ContentTooLong {
        platform: Platform,
        limit: usize,
        actual: usize,
    },
}

impl OAuthError {
    pub fn configuration(message: impl Into<String>) -> Self {
        OAuthError::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        OAuthError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Short, non-sensitive code carried in the `error=` redirect parameter.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::Configuration { .. } => "configuration_error",
            OAuthError::InvalidState => "invalid_state",
            OAuthError::InvalidRequest { .. } => "invalid_request",
            OAuthError::ProviderRejected { status: 401, .. } => "reauthorization_required",
            OAuthError::ProviderRejected { .. } => "provider_rejected",
            OAuthError::ProviderUnavailable { .. } => "provider_unavailable",
            OAuthError::MalformedResponse { .. } => "invalid_response",
            OAuthError::Decryption => "decryption_failed",
            OAuthError::UnsupportedContent { .. } => "unsupported_content",
            OAuthError::ContentTooLong { .. } => "content_too_long",
        }
    }

    /// HTTP-like status for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            OAuthError::Configuration { .. } => 500,
            OAuthError::InvalidState => 400,
            OAuthError::InvalidRequest { .. } => 400,
            OAuthError::ProviderRejected { status, .. } => *status,
            OAuthError::ProviderUnavailable { .. } => 503,
            OAuthError::MalformedResponse { .. } => 400,
            OAuthError::Decryption => 500,
            OAuthError::UnsupportedContent { .. } => 422,
            OAuthError::ContentTooLong { .. } => 422,
        }
    }

    /// True for failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OAuthError::ProviderUnavailable { .. })
    }

    /// True when the caller must send the user through authorization again
    /// (the provider no longer accepts the token).
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, OAuthError::ProviderRejected { status: 401, .. })
    }
}

pub type OAuthResult<T> = Result<T, OAuthError>;
