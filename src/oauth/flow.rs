//! Authorization-code flow driven on behalf of the route layer.
//!
//! ```text
//! INITIATED ──► AWAITING_CALLBACK ──► EXCHANGING ──► CONNECTED
//!                      │                   │
//!                      ▼                   ▼
//!                  REJECTED              FAILED
//! ```
//!
//! A state is consumed on the first callback that presents it, so a second
//! callback with the same state always ends in `REJECTED`.

use super::{OAuthService, OAuthStateStore, Platform, ProviderProfile, TokenSet};
use crate::credentials::{EncryptedToken, EncryptedTokenSet};
use crate::error::{OAuthError, OAuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest provider error code carried into errors and logs
const MAX_PROVIDER_ERROR_CODE_LEN: usize = 64;

/// Stages of one authorization attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStage {
    Initiated,
    AwaitingCallback,
    Exchanging,
    Connected,
    Rejected,
    Failed,
}

/// OAuth callback query parameters
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where to send the user, and the state bound to the attempt.
#[derive(Clone, Debug)]
pub struct AuthorizationStart {
    pub url: String,
    pub state: String,
}

/// Result of a completed authorization, ready for persistence.
#[derive(Clone, Debug, Serialize)]
pub struct ConnectedAccount {
    pub user_id: String,
    pub organization_id: Option<String>,
    pub platform: Platform,
    pub profile: ProviderProfile,
    pub tokens: EncryptedTokenSet,
    pub connected_at: DateTime<Utc>,
}

/// Drives authorization attempts against an injected state store.
#[derive(Clone)]
pub struct AuthorizationFlow {
    store: Arc<OAuthStateStore>,
}

impl AuthorizationFlow {
    pub fn new(store: Arc<OAuthStateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<OAuthStateStore> {
        &self.store
    }

    /// Issue a state and build the provider authorization URL.
    pub fn start<S>(&self, service: &S, user_id: &str, organization_id: Option<&str>) -> AuthorizationStart
    where
        S: OAuthService + ?Sized,
    {
        let platform = service.platform();
        let state = self.store.issue(user_id, platform, organization_id);
        transition(platform, FlowStage::Initiated);

        let url = service.authorization_url(&state);
        transition(platform, FlowStage::AwaitingCallback);

        AuthorizationStart { url, state }
    }

    /// Validate the callback, exchange the code and encrypt the tokens.
    ///
    /// A missing code is `InvalidRequest`; a missing, unknown, expired or
    /// foreign state is `InvalidState` and never reaches the provider.
    pub async fn complete<S>(&self, service: &S, params: CallbackParams) -> OAuthResult<ConnectedAccount>
    where
        S: OAuthService + ?Sized,
    {
        let platform = service.platform();

        if let Some(error) = params.error.as_deref().map(provider_error_code) {
            // Burn the state so it cannot be replayed with a forged code
            if let Some(state) = params.state.as_deref() {
                self.store.consume(state);
            }
            warn!(
                platform = %platform,
                error = %error,
                "Authorization denied at provider"
            );
            transition(platform, FlowStage::Rejected);
            return Err(OAuthError::ProviderRejected {
                platform,
                status: 400,
                message: error,
            });
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                transition(platform, FlowStage::Rejected);
                OAuthError::invalid_request("Missing 'code' parameter")
            })?;

        let state = params.state.unwrap_or_default();
        let entry = self
            .store
            .consume(&state)
            .filter(|entry| entry.platform == platform)
            .ok_or_else(|| {
                warn!(platform = %platform, "Invalid or expired OAuth state");
                transition(platform, FlowStage::Rejected);
                OAuthError::InvalidState
            })?;

        transition(platform, FlowStage::Exchanging);

        let connected = async {
            let tokens = service.exchange_code_for_tokens(&code, &entry.state).await?;
            let profile = service.get_user_profile(&tokens.access_token).await?;
            let tokens = encrypt_token_set(service, &tokens, None, Utc::now())?;
            Ok::<_, OAuthError>((profile, tokens))
        }
        .await;

        let (profile, tokens) = connected.map_err(|e| {
            warn!(platform = %platform, error_code = e.error_code(), "Token exchange failed");
            transition(platform, FlowStage::Failed);
            e
        })?;

        transition(platform, FlowStage::Connected);
        info!(
            platform = %platform,
            has_refresh_token = tokens.refresh_token.is_some(),
            "OAuth flow completed successfully"
        );

        Ok(ConnectedAccount {
            user_id: entry.user_id,
            organization_id: entry.organization_id,
            platform,
            profile,
            tokens,
            connected_at: Utc::now(),
        })
    }
}

/// Reduce the provider's `error` query value to a short `[a-z0-9_]` code.
///
/// The value arrives on an unauthenticated redirect, so it is never logged
/// or stored verbatim.
fn provider_error_code(raw: &str) -> String {
    let code: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_PROVIDER_ERROR_CODE_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    if code.is_empty() {
        "unknown_error".to_string()
    } else {
        code
    }
}

fn transition(platform: Platform, stage: FlowStage) {
    debug!(platform = %platform, stage = ?stage, "OAuth flow transition");
}

/// Encrypt a fresh token set for persistence.
///
/// When the provider did not rotate the refresh token, `previous_refresh`
/// is carried over.
pub fn encrypt_token_set<S>(
    service: &S,
    tokens: &TokenSet,
    previous_refresh: Option<&EncryptedToken>,
    now: DateTime<Utc>,
) -> OAuthResult<EncryptedTokenSet>
where
    S: OAuthService + ?Sized,
{
    let refresh_token = match tokens.refresh_token.as_deref() {
        Some(token) => Some(service.encrypt_token(token)?),
        None => previous_refresh.cloned(),
    };

    Ok(EncryptedTokenSet {
        access_token: service.encrypt_token(&tokens.access_token)?,
        refresh_token,
        expires_at: tokens.expires_at(now),
        scope: tokens.scope.clone(),
    })
}

/// Decrypt, refresh and re-encrypt stored tokens.
///
/// Providers without refresh tokens (Instagram, Facebook) renew the
/// long-lived access token itself, so it is used when no refresh token is
/// stored. Concurrent refreshes are not de-duplicated: the caller persists
/// the latest result and the last write wins.
pub async fn refresh_tokens<S>(service: &S, stored: &EncryptedTokenSet) -> OAuthResult<EncryptedTokenSet>
where
    S: OAuthService + ?Sized,
{
    let credential = match &stored.refresh_token {
        Some(refresh) => service.decrypt_token(refresh)?,
        None => service.decrypt_token(&stored.access_token)?,
    };

    let tokens = service.refresh_access_token(&credential).await.map_err(|e| {
        if e.requires_reauthorization() {
            warn!(platform = %service.platform(), "Refresh token rejected, re-authorization required");
        }
        e
    })?;

    encrypt_token_set(service, &tokens, stored.refresh_token.as_ref(), Utc::now())
}

/// Decrypt and revoke a stored access token. Never fails the caller, even
/// if the stored value cannot be decrypted.
pub async fn revoke_tokens<S>(service: &S, access_token: &EncryptedToken)
where
    S: OAuthService + ?Sized,
{
    match service.decrypt_token(access_token) {
        Ok(token) => service.revoke_access(&token).await,
        Err(_) => warn!(
            platform = %service.platform(),
            "Stored token could not be decrypted, skipping upstream revocation"
        ),
    }
}

/// Build the redirect back to the application UI.
///
/// Success carries `connected=<platform>`; failures carry only the short
/// error code, never provider messages.
pub fn callback_redirect(
    frontend_url: &str,
    platform: Platform,
    outcome: &OAuthResult<ConnectedAccount>,
) -> String {
    let base = format!("{}/accounts", frontend_url.trim_end_matches('/'));
    match outcome {
        Ok(_) => format!("{}?connected={}", base, platform),
        Err(e) => format!(
            "{}?error={}&platform={}",
            base,
            urlencoding::encode(e.error_code()),
            platform
        ),
    }
}
