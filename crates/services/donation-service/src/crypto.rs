//! Protection of personal user fields at rest.
//!
//! # Algorithms
//!
//! - **Encryption**: ChaCha20-Poly1305 (authenticated encryption), fresh
//!   random nonce per value, stored as base64 of `nonce || ciphertext || tag`
//! - **Blind index**: HMAC-SHA256 keyed with the same secret, hex encoded,
//!   so equality lookups never need to decrypt a column

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use common::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Constants
// =============================================================================

/// Key length (256-bit)
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Ciphertext and blind index of one sensitive value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedField {
    pub ciphertext: String,
    pub blind_index: String,
}

/// Encrypts, decrypts and indexes sensitive fields with one 256-bit secret.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").field("key", &"[REDACTED]").finish()
    }
}

impl FieldCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build a cipher from a 64 character hex secret.
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|_| AppError::config("DATA_ENCRYPTION_KEY must be a valid hex string"))?;

        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            AppError::config(format!(
                "DATA_ENCRYPTION_KEY must be {} bytes ({} hex characters)",
                KEY_LEN,
                KEY_LEN * 2
            ))
        })?;

        Ok(Self::new(key))
    }

    /// Encrypt a value under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| AppError::crypto(format!("Encryption failed: {e}")))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(payload))
    }

    /// Decrypt a value produced by [`FieldCipher::encrypt`].
    ///
    /// Fails if the payload was tampered with or sealed under another key.
    pub fn decrypt(&self, sealed: &str) -> AppResult<String> {
        let payload = BASE64
            .decode(sealed)
            .map_err(|e| AppError::crypto(format!("Ciphertext is not base64: {e}")))?;

        if payload.len() < NONCE_LEN + AUTH_TAG_LEN {
            return Err(AppError::crypto("Ciphertext too short"));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::crypto("Failed to decrypt field (wrong key or tampered data)"))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::crypto("Decrypted field is not valid UTF-8"))
    }

    /// Deterministic keyed hash used for equality lookups.
    pub fn blind_index(&self, plaintext: &str) -> AppResult<String> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| AppError::crypto(format!("Invalid HMAC key: {e}")))?;
        mac.update(plaintext.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Encrypt and index a value in one step.
    pub fn seal(&self, plaintext: &str) -> AppResult<SealedField> {
        Ok(SealedField {
            ciphertext: self.encrypt(plaintext)?,
            blind_index: self.blind_index(plaintext)?,
        })
    }

    pub fn seal_optional(&self, plaintext: Option<&str>) -> AppResult<Option<SealedField>> {
        plaintext.map(|p| self.seal(p)).transpose()
    }

    pub fn decrypt_optional(&self, sealed: Option<&str>) -> AppResult<Option<String>> {
        sealed.map(|s| self.decrypt(s)).transpose()
    }
}
