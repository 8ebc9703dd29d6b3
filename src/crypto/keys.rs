//! The vault key and its password-check value.
//!
//! The auth check lets `load` reject a wrong password before touching
//! any ciphertext.  It is an HMAC-SHA256 tag over a fixed label, keyed
//! with a sub-key that HKDF derives from the vault key, so the stored
//! value reveals nothing about the key used for AES-GCM.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{EnvyError, Result};

/// Length of the vault key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

const AUTH_KEY_INFO: &[u8] = b"envy-auth-check";
const AUTH_CHECK_LABEL: &[u8] = b"envy-vault-auth-check";

/// The symmetric key that encrypts every secret value in the vault.
///
/// Zeroed on drop and never copied implicitly.  `load` hands one of
/// these back so later saves in the same session skip the KDF.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// Compute the password-check value stored in the vault document.
pub fn generate_auth_check(key: &VaultKey) -> Result<String> {
    let mac = auth_mac(key)?;
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Recompute the check for `key` and compare it against `check`.
///
/// The comparison is constant-time.  A check that is not valid base64
/// simply fails to verify.
pub fn verify_auth_check(key: &VaultKey, check: &str) -> bool {
    let Ok(expected) = BASE64.decode(check) else {
        return false;
    };
    match auth_mac(key) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

fn auth_mac(key: &VaultKey) -> Result<Hmac<Sha256>> {
    let mut auth_key = derive_auth_key(key)?;
    let mac = Hmac::<Sha256>::new_from_slice(&auth_key);
    auth_key.zeroize();
    let mut mac = mac.map_err(|e| EnvyError::KeyDerivationFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(AUTH_CHECK_LABEL);
    Ok(mac)
}

/// HKDF-SHA256 expand with the vault key used directly as the PRK.
///
/// No extract step: the key already came out of Argon2id uniformly
/// random and is exactly one SHA-256 block wide.
fn derive_auth_key(key: &VaultKey) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::from_prk(key.as_bytes())
        .map_err(|e| EnvyError::KeyDerivationFailed(format!("invalid HKDF PRK: {e}")))?;

    let mut okm = [0u8; KEY_LEN];
    hk.expand(AUTH_KEY_INFO, &mut okm)
        .map_err(|e| EnvyError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_check_is_deterministic() {
        let key = VaultKey::from_bytes([3u8; KEY_LEN]);
        assert_eq!(
            generate_auth_check(&key).unwrap(),
            generate_auth_check(&key).unwrap()
        );
    }

    #[test]
    fn auth_check_does_not_contain_key() {
        let key = VaultKey::from_bytes([0x5Au8; KEY_LEN]);
        let check = generate_auth_check(&key).unwrap();
        assert_ne!(BASE64.decode(&check).unwrap(), key.as_bytes().to_vec());
        assert_ne!(check, BASE64.encode(key.as_bytes()));
    }

    #[test]
    fn garbage_check_does_not_verify() {
        let key = VaultKey::from_bytes([1u8; KEY_LEN]);
        assert!(!verify_auth_check(&key, "not base64 !!"));
        assert!(!verify_auth_check(&key, ""));
    }

    #[test]
    fn auth_key_is_expand_only() {
        let key = VaultKey::from_bytes([9u8; KEY_LEN]);
        let mut expected = [0u8; KEY_LEN];
        Hkdf::<Sha256>::from_prk(key.as_bytes())
            .unwrap()
            .expand(AUTH_KEY_INFO, &mut expected)
            .unwrap();
        let mut extracted = [0u8; KEY_LEN];
        Hkdf::<Sha256>::new(None, key.as_bytes())
            .expand(AUTH_KEY_INFO, &mut extracted)
            .unwrap();

        assert_eq!(derive_auth_key(&key).unwrap(), expected);
        assert_ne!(expected, extracted);
    }

    #[test]
    fn debug_is_redacted() {
        let key = VaultKey::from_bytes([0xFFu8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "VaultKey([REDACTED])");
    }
}
