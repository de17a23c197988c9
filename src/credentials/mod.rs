//! Token encryption for OAuth credentials.
//!
//! Bearer and refresh tokens are never persisted in plaintext. The account
//! layer stores [`EncryptedToken`] values and decrypts them immediately
//! before each outbound provider call.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Platform adapter / flow           │
//! │  - encrypt_token / decrypt_token        │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       TokenCipher                        │
//! │  - AES-256-GCM, 16-byte IV per token     │
//! │  - iv:authTag:ciphertext (hex)           │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!   account records (external persistence)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use socialink::credentials::TokenCipher;
//!
//! # fn main() -> Result<(), socialink::OAuthError> {
//! let key = std::env::var("ENCRYPTION_KEY").unwrap_or_default();
//! let cipher = TokenCipher::new(&key, "aes-256-gcm")?;
//!
//! let stored = cipher.encrypt("provider_access_token")?;
//! let token = cipher.decrypt(&stored)?;
//! assert_eq!(token, "provider_access_token");
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod encryption;

pub use encryption::{validate_key, TokenCipher, DEFAULT_ALGORITHM, MIN_KEY_HEX_LEN};

/// A token encrypted by [`TokenCipher`], in `iv:authTag:ciphertext` form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedToken(String);

impl EncryptedToken {
    /// Wraps a value loaded from storage. Validity is only checked on decrypt.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EncryptedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for EncryptedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedToken({} chars)", self.0.len())
    }
}

/// Encrypted tokens as the account layer persists them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedTokenSet {
    pub access_token: EncryptedToken,

    pub refresh_token: Option<EncryptedToken>,

    /// When the access token expires (UTC)
    pub expires_at: Option<DateTime<Utc>>,

    pub scope: Option<String>,
}
