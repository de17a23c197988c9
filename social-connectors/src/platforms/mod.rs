//! Platform adapters.
//!
//! One struct per provider, each composing a [`ProviderClient`] with the
//! provider's endpoints, field names and error envelopes.

pub mod facebook;
pub mod instagram;
pub mod linkedin;
pub mod tiktok;
pub mod twitter;

pub use facebook::FacebookConnector;
pub use instagram::InstagramConnector;
pub use linkedin::LinkedinConnector;
pub use tiktok::TiktokConnector;
pub use twitter::TwitterConnector;

use socialink::oauth::ProviderClient;

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Log an upstream revocation failure. Revocation never fails the caller.
pub(crate) fn log_revoke_failure(client: &ProviderClient, error: &socialink::OAuthError) {
    tracing::warn!(
        platform = %client.platform(),
        error_code = error.error_code(),
        "Upstream token revocation failed, continuing with local removal"
    );
}
