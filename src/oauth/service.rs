use super::{generate_state_token, Platform, ProviderClient, ProviderProfile, TokenSet};
use crate::config::PlatformCredentialsConfig;
use crate::credentials::EncryptedToken;
use crate::error::OAuthResult;
use async_trait::async_trait;

/// OAuth client contract implemented by every platform adapter.
///
/// Adapters are stateless apart from their immutable registration; all
/// per-attempt state lives in the [`OAuthStateStore`](super::OAuthStateStore)
/// and the caller's account records.
///
/// # Lifecycle
/// 1. Caller issues a state and redirects to `authorization_url(state)`
/// 2. Provider redirects back with `code` and `state`
/// 3. Caller consumes the state, then calls `exchange_code_for_tokens`
/// 4. Caller encrypts and persists the tokens
/// 5. Later calls decrypt first, then refresh / fetch profile / revoke
///
/// # Errors
/// Every failure is an [`OAuthError`](crate::OAuthError):
/// - bad code or token → `ProviderRejected` (401 on refresh means re-authorize)
/// - timeout, 5xx, 429 → `ProviderUnavailable` (retry with backoff)
/// - empty or undecodable body → `MalformedResponse`
#[async_trait]
pub trait OAuthService: Send + Sync {
    /// Shared HTTP client, registration and cipher.
    fn client(&self) -> &ProviderClient;

    fn platform(&self) -> Platform {
        self.client().platform()
    }

    fn credentials(&self) -> &PlatformCredentialsConfig {
        self.client().credentials()
    }

    /// Provider authorization URL carrying `response_type=code`, client id,
    /// `redirect_uri`, `scope` and `state`, all URL-encoded.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens.
    ///
    /// `state` is the already validated state of this attempt; adapters that
    /// need PKCE derive the verifier from it, others ignore it.
    async fn exchange_code_for_tokens(&self, code: &str, state: &str) -> OAuthResult<TokenSet>;

    /// Obtain a fresh access token.
    ///
    /// Providers may rotate the refresh token on every call; the caller must
    /// persist whatever comes back.
    async fn refresh_access_token(&self, refresh_token: &str) -> OAuthResult<TokenSet>;

    /// Fetch the normalized profile. Only `id` is required from the provider.
    async fn get_user_profile(&self, access_token: &str) -> OAuthResult<ProviderProfile>;

    /// Revoke the token upstream, best-effort.
    ///
    /// Never fails: the local account is removed regardless, so upstream
    /// errors are only logged.
    async fn revoke_access(&self, access_token: &str);

    fn generate_state(&self) -> String {
        generate_state_token()
    }

    fn encrypt_token(&self, token: &str) -> OAuthResult<EncryptedToken> {
        self.client().cipher().encrypt(token)
    }

    fn decrypt_token(&self, token: &EncryptedToken) -> OAuthResult<String> {
        self.client().cipher().decrypt(token)
    }
}
