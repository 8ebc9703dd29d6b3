//! AES-256-GCM authenticated encryption of individual field values.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! returns a self-contained base64 token.  Layout of the decoded token:
//!   [ 12-byte nonce | ciphertext | 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::keys::VaultKey;
use crate::errors::{EnvyError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Smallest decoded token: an empty plaintext still carries nonce + tag.
pub const MIN_TOKEN_LEN: usize = NONCE_LEN + TAG_LEN;

/// Encrypt `plaintext` under `key` and return a printable token.
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| EnvyError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| EnvyError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(output))
}

/// Decrypt a token produced by `encrypt`.
///
/// Fails with `TokenDecode` for non-base64 input, `TokenTooShort` when
/// the decoded bytes cannot hold a nonce and tag, and `DecryptionFailed`
/// when the tag does not verify (tampering or wrong key).
pub fn decrypt(key: &VaultKey, token: &str) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(token)
        .map_err(|e| EnvyError::TokenDecode(e.to_string()))?;

    if raw.len() < MIN_TOKEN_LEN {
        return Err(EnvyError::TokenTooShort {
            len: raw.len(),
            min: MIN_TOKEN_LEN,
        });
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| EnvyError::DecryptionFailed)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EnvyError::DecryptionFailed)
}
