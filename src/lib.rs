// Configuration (environment + optional TOML)
pub mod config;

// Token encryption at rest
pub mod credentials;

// OAuth state, service contract, provider client and flow
pub mod oauth;

// Publishing and insights
pub mod content;

// Normalized error taxonomy
pub mod error;

pub use error::{OAuthError, OAuthResult};
