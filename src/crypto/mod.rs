//! Cryptographic primitives for the vault.
//!
//! This module provides:
//! - AES-256-GCM field encryption into base64 tokens (`encryption`)
//! - Argon2id password-based key derivation and salts (`kdf`)
//! - The zeroizing `VaultKey` and the password-check value (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_key, derive_key_with_params, generate_salt, Argon2Params, SALT_LEN};
pub use keys::{generate_auth_check, verify_auth_check, VaultKey, KEY_LEN};
