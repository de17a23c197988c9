//! AES-256-GCM encryption for bearer and refresh tokens.
//!
//! Every token is encrypted with its own random 16-byte IV and persisted as
//! `iv:authTag:ciphertext`, each segment hex-encoded. That layout is a storage
//! contract: changing it means migrating every stored token.

use super::EncryptedToken;
use crate::config::EncryptionConfig;
use crate::error::{OAuthError, OAuthResult};
use aes_gcm::{
    aead::{consts::U16, Aead, AeadCore, KeyInit, OsRng},
    aes::Aes256,
    AesGcm, Nonce,
};

/// AES-256-GCM with a 128-bit IV instead of the usual 96-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Minimum length of the hex-encoded key
pub const MIN_KEY_HEX_LEN: usize = KEY_SIZE * 2;

/// Size of the IV in bytes
const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// The only supported algorithm identifier.
pub const DEFAULT_ALGORITHM: &str = "aes-256-gcm";

/// Validates a hex-encoded master key and returns the 32 key bytes.
///
/// The key must be at least 64 hex characters; the first 64 form the key.
pub fn validate_key(key_hex: &str) -> OAuthResult<[u8; KEY_SIZE]> {
    let key_hex = key_hex.trim();
    if key_hex.len() < MIN_KEY_HEX_LEN {
        return Err(OAuthError::configuration(format!(
            "ENCRYPTION_KEY must be at least {} hex characters, got {}",
            MIN_KEY_HEX_LEN,
            key_hex.len()
        )));
    }

    if !key_hex.is_ascii() {
        return Err(OAuthError::configuration("ENCRYPTION_KEY must be hex-encoded"));
    }

    let bytes = hex::decode(&key_hex[..MIN_KEY_HEX_LEN])
        .map_err(|_| OAuthError::configuration("ENCRYPTION_KEY must be hex-encoded"))?;

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Symmetric cipher for tokens at rest.
///
/// Constructed once at startup; a bad key fails construction, never a call.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm16,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("algorithm", &DEFAULT_ALGORITHM)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher {
    /// Creates a cipher from a hex key and an algorithm name.
    pub fn new(key_hex: &str, algorithm: &str) -> OAuthResult<Self> {
        if !algorithm.eq_ignore_ascii_case(DEFAULT_ALGORITHM) {
            return Err(OAuthError::configuration(format!(
                "Unsupported ENCRYPTION_ALGORITHM '{}', only {} is available",
                algorithm, DEFAULT_ALGORITHM
            )));
        }

        let key = validate_key(key_hex)?;
        let cipher = Aes256Gcm16::new_from_slice(&key)
            .map_err(|_| OAuthError::configuration("Invalid encryption key length"))?;

        Ok(Self { cipher })
    }

    pub fn from_config(config: &EncryptionConfig) -> OAuthResult<Self> {
        Self::new(&config.key, &config.algorithm)
    }

    /// Encrypts a token with a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> OAuthResult<EncryptedToken> {
        // One random draw per call, never reused
        let iv = Aes256Gcm16::generate_nonce(&mut OsRng);

        let mut sealed = self
            .cipher
            .encrypt(&iv, plaintext.as_bytes())
            .map_err(|_| {
                tracing::error!("Token encryption failed");
                OAuthError::configuration("Token encryption failed")
            })?;

        // aes-gcm appends the tag to the ciphertext
        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        Ok(EncryptedToken(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(sealed)
        )))
    }

    /// Decrypts a stored token.
    ///
    /// Every failure (bad layout, bad hex, wrong IV/tag length, tag mismatch)
    /// collapses into [`OAuthError::Decryption`].
    pub fn decrypt(&self, token: &EncryptedToken) -> OAuthResult<String> {
        let result = self.open(token.as_str());
        if result.is_err() {
            tracing::warn!("Token decryption failed (corrupted data or wrong key)");
        }
        result
    }

    fn open(&self, value: &str) -> OAuthResult<String> {
        let parts: Vec<&str> = value.split(':').collect();
        let [iv_hex, tag_hex, ciphertext_hex] = parts.as_slice() else {
            return Err(OAuthError::Decryption);
        };

        // An empty plaintext yields an empty ciphertext segment
        if iv_hex.is_empty() || tag_hex.is_empty() {
            return Err(OAuthError::Decryption);
        }

        let iv = hex::decode(iv_hex).map_err(|_| OAuthError::Decryption)?;
        let tag = hex::decode(tag_hex).map_err(|_| OAuthError::Decryption)?;
        let mut sealed = hex::decode(ciphertext_hex).map_err(|_| OAuthError::Decryption)?;

        if iv.len() != IV_SIZE || tag.len() != TAG_SIZE {
            return Err(OAuthError::Decryption);
        }

        sealed.extend_from_slice(&tag);
        let plaintext = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_ref())
            .map_err(|_| OAuthError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| OAuthError::Decryption)
    }
}
