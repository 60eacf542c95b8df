//! Credential vault: encrypt, decrypt, and mask provider API keys.
//!
//! The key is derived once at construction and is read-only afterwards, so
//! a single vault can serve concurrent dispatches without locking. The
//! public surface never raises: callers get `""` back on any failure and
//! the detail goes to the log, so a corrupted stored key degrades into
//! "API key not configured" downstream instead of a crash.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::keys::VaultKey;
use super::CryptoError;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const MASK_CHAR: char = '•';

/// Process-wide API key vault. Construct once, share via `Arc`.
pub struct CredentialVault {
    key: VaultKey,
}

impl CredentialVault {
    /// Derive the vault key from the process secret. PBKDF2 runs here,
    /// once — not per call.
    pub fn new(secret: &str) -> Self {
        Self {
            key: VaultKey::derive(secret),
        }
    }

    /// Encrypt an API key for storage.
    ///
    /// Empty or whitespace-only input encrypts to `""`. Output is
    /// base64(nonce ‖ ciphertext ‖ tag).
    pub fn encrypt(&self, raw_key: &str) -> String {
        if raw_key.trim().is_empty() {
            return String::new();
        }
        match self.try_encrypt(raw_key.as_bytes()) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                tracing::error!("API key encryption failed: {e}");
                String::new()
            }
        }
    }

    /// Decrypt a stored API key.
    ///
    /// `""` decrypts to `""`. Malformed or foreign ciphertext decrypts to
    /// `""` with a logged warning — never an error to the caller.
    pub fn decrypt(&self, encrypted_key: &str) -> String {
        if encrypted_key.is_empty() {
            return String::new();
        }
        match self.try_decrypt(encrypted_key) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!("API key decryption failed: {e}");
                String::new()
            }
        }
    }

    /// Mask an API key for display.
    ///
    /// Keys of 8 chars or fewer render as exactly 8 mask characters;
    /// longer keys keep their first and last 4 chars, total length
    /// preserved.
    pub fn mask(&self, api_key: &str) -> String {
        if api_key.is_empty() {
            return String::new();
        }
        let len = api_key.chars().count();
        if len <= 8 {
            return MASK_CHAR.to_string().repeat(8);
        }
        let head: String = api_key.chars().take(4).collect();
        let tail: String = api_key.chars().skip(len - 4).collect();
        format!("{head}{}{tail}", MASK_CHAR.to_string().repeat(len - 8))
    }

    fn try_encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let key = Key::<Aes256Gcm>::from_slice(self.key.as_bytes());
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut bytes = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        bytes.extend_from_slice(&nonce_bytes);
        bytes.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(bytes))
    }

    fn try_decrypt(&self, encrypted_key: &str) -> Result<String, CryptoError> {
        let bytes = BASE64
            .decode(encrypted_key)
            .map_err(|_| CryptoError::MalformedCiphertext)?;
        if bytes.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptoError::MalformedCiphertext);
        }

        let key = Key::<Aes256Gcm>::from_slice(self.key.as_bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&bytes[..NONCE_LENGTH]);

        let plaintext = cipher
            .decrypt(nonce, &bytes[NONCE_LENGTH..])
            .map_err(|_| CryptoError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
