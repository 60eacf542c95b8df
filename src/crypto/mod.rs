pub mod keys;
pub mod vault;

pub use keys::*;
pub use vault::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Malformed ciphertext encoding")]
    MalformedCiphertext,
}
