//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Parameters come from `StoreConfig` at vault
//! creation and are then pinned in the vault document.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::TryRngCore;
use zeroize::Zeroize;

use super::keys::{VaultKey, KEY_LEN};
use crate::errors::{EnvyError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;
/// Largest accepted memory cost in KiB (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;
/// Largest accepted iteration count.
pub const MAX_ITERATIONS: u32 = 32;
/// Largest accepted lane count.
pub const MAX_PARALLELISM: u32 = 16;

impl Argon2Params {
    /// Check the parameters against the accepted range.
    ///
    /// Values read back from a vault file are untrusted, so the upper
    /// bounds matter as much as the lower ones.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.memory_kib < MIN_MEMORY_KIB || self.memory_kib > MAX_MEMORY_KIB {
            return Err(format!(
                "Argon2 memory_kib must be in {MIN_MEMORY_KIB}..={MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            ));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(format!(
                "Argon2 iterations must be in 1..={MAX_ITERATIONS} (got {})",
                self.iterations
            ));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(format!(
                "Argon2 parallelism must be in 1..={MAX_PARALLELISM} (got {})",
                self.parallelism
            ));
        }
        Ok(())
    }
}

/// Derive the 32-byte vault key with the default Argon2id parameters.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<VaultKey> {
    derive_key_with_params(password, salt, &Argon2Params::default())
}

/// Derive the 32-byte vault key with explicit Argon2id parameters.
///
/// The same password + salt + params will always produce the same key.
/// Parameters outside `Argon2Params::check` are refused.
pub fn derive_key_with_params(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<VaultKey> {
    argon2_params.check().map_err(EnvyError::KeyDerivationFailed)?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| EnvyError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| EnvyError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    let vault_key = VaultKey::from_bytes(key);
    key.zeroize();
    Ok(vault_key)
}

/// Generate a random 16-byte salt from the operating system CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| EnvyError::RandomFailed(e.to_string()))?;
    Ok(salt)
}
