use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_LENGTH: usize = 32; // AES-256

/// Fixed salt so ciphertext stays decryptable across restarts given the
/// same process secret.
pub(super) const VAULT_SALT: &[u8] = b"ai_model_salt";

/// Symmetric vault key — zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct VaultKey {
    pub(super) key_bytes: [u8; KEY_LENGTH],
}

impl VaultKey {
    /// Derive from the process secret using PBKDF2-SHA256
    pub fn derive(secret: &str) -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(
            secret.as_bytes(),
            VAULT_SALT,
            PBKDF2_ITERATIONS,
            &mut key_bytes,
        );
        Self { key_bytes }
    }

    /// Access the raw key bytes (internal use only)
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key_bytes
    }
}
