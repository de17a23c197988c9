//! OAuth 2.0 authorization-code client shared by every social platform.
//!
//! Implements the authorization code flow:
//! 1. Caller asks for an authorization URL (state issued and stored)
//! 2. User authorizes on the provider's site
//! 3. Provider redirects back with `code` and `state`
//! 4. State is consumed (single use), code exchanged for tokens
//! 5. Tokens are encrypted and handed to the caller for persistence
//! 6. Later calls decrypt, then refresh / fetch profile / revoke

mod client;
mod flow;
mod platform;
mod service;
mod state_manager;
mod types;

pub use client::{extract_error_message, ProviderClient, RequestKind, DEFAULT_TIMEOUT};
pub use flow::{
    callback_redirect, encrypt_token_set, refresh_tokens, revoke_tokens, AuthorizationFlow,
    AuthorizationStart, CallbackParams, ConnectedAccount, FlowStage,
};
pub use platform::Platform;
pub use service::OAuthService;
pub use state_manager::{
    generate_state_token, run_state_cleanup, OAuthStateEntry, OAuthStateStore,
    DEFAULT_STATE_TTL_SECONDS,
};
pub use types::{json_id, json_str, json_u64, non_empty, ProviderProfile, TokenSet};
