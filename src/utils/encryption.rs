//! Field-level encryption for credentials stored at rest.
//!
//! WordPress application passwords are encrypted with AES-256-GCM before
//! they reach the integration repository and decrypted only inside the
//! publisher worker, just before the CMS call.

use std::env;

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::utils::{base64_decode, base64_encode};

const KEY_ENV_VAR: &str = "STORAGE_ENCRYPTION_KEY";

#[derive(Debug, Error, Clone)]
pub enum EncryptionError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid encrypted data format: {0}")]
    InvalidFormat(String),
    #[error("{KEY_ENV_VAR} must be set to a base64-encoded 32-byte key")]
    MissingKey,
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Nonce and ciphertext as stored; the whole structure is serialized to
/// JSON and base64-encoded so the stored value is a single opaque string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptedData {
    /// Base64-encoded 12-byte GCM nonce.
    nonce: String,
    /// Base64-encoded ciphertext with authentication tag.
    ciphertext: String,
    version: u8,
}

#[derive(Clone)]
pub struct FieldEncryption {
    cipher: Aes256Gcm,
}

impl FieldEncryption {
    /// Loads the key from the `STORAGE_ENCRYPTION_KEY` environment variable.
    pub fn new() -> Result<Self, EncryptionError> {
        let key_b64 = env::var(KEY_ENV_VAR).map_err(|_| EncryptionError::MissingKey)?;
        let mut key_bytes = base64_decode(&key_b64)
            .map_err(|e| EncryptionError::InvalidFormat(e.to_string()))?;
        if key_bytes.len() != 32 {
            let len = key_bytes.len();
            key_bytes.zeroize();
            return Err(EncryptionError::InvalidKeyLength(len));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        key_bytes.zeroize();
        Ok(Self { cipher })
    }

    pub fn new_with_key(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Encrypts a string into an opaque base64 value.
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let data = EncryptedData {
            nonce: base64_encode(&nonce_bytes),
            ciphertext: base64_encode(&ciphertext),
            version: 1,
        };
        let json = serde_json::to_string(&data)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;
        Ok(base64_encode(json.as_bytes()))
    }

    /// Decrypts a value produced by [`encrypt_string`](Self::encrypt_string).
    pub fn decrypt_string(&self, encrypted_b64: &str) -> Result<String, EncryptionError> {
        let json_bytes = base64_decode(encrypted_b64)
            .map_err(|e| EncryptionError::InvalidFormat(format!("invalid base64: {e}")))?;
        let json = String::from_utf8(json_bytes)
            .map_err(|e| EncryptionError::InvalidFormat(format!("invalid UTF-8: {e}")))?;
        let data: EncryptedData = serde_json::from_str(&json)
            .map_err(|e| EncryptionError::InvalidFormat(format!("invalid structure: {e}")))?;

        if data.version != 1 {
            return Err(EncryptionError::InvalidFormat(format!(
                "unsupported encryption version: {}",
                data.version
            )));
        }

        let nonce_bytes = base64_decode(&data.nonce)
            .map_err(|e| EncryptionError::InvalidFormat(format!("invalid nonce: {e}")))?;
        if nonce_bytes.len() != 12 {
            return Err(EncryptionError::InvalidFormat(format!(
                "invalid nonce length: expected 12, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = base64_decode(&data.ciphertext)
            .map_err(|e| EncryptionError::InvalidFormat(format!("invalid ciphertext: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| EncryptionError::DecryptionFailed(format!("invalid UTF-8: {e}")))
    }

    /// Generates a fresh base64-encoded key for initial setup.
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        let encoded = base64_encode(&key);
        key.zeroize();
        encoded
    }
}
