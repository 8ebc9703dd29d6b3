use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in the vault engine.
///
/// Messages carry paths and project/secret names only. Plaintext values,
/// keys and passwords never end up in an error.
#[derive(Debug, Error)]
pub enum EnvyError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — ciphertext was tampered with or the key is wrong")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Random number generator failed: {0}")]
    RandomFailed(String),

    #[error("Ciphertext token is not valid base64: {0}")]
    TokenDecode(String),

    #[error("Ciphertext token too short: {len} bytes, need at least {min}")]
    TokenTooShort { len: usize, min: usize },

    #[error("Decrypted value is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    // --- Vault errors ---
    #[error("Authentication failed — incorrect password")]
    AuthenticationFailed,

    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Failed to {op} {field} value for {project} ({environment}).{secret}: {source}")]
    SecretField {
        op: &'static str,
        field: &'static str,
        project: String,
        environment: String,
        secret: String,
        #[source]
        source: Box<EnvyError>,
    },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    // --- Lock errors ---
    #[error("Vault lock at {0} is held by another process")]
    LockUnavailable(PathBuf),

    #[error("Lock error: {0}")]
    Lock(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EnvyError {
    /// Wrong password. Callers should re-prompt rather than treat the
    /// vault as broken.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }

    /// AEAD tag mismatch, possibly wrapped with field context.
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::DecryptionFailed => true,
            Self::SecretField { source, .. } => source.is_integrity(),
            _ => false,
        }
    }

    /// Malformed document or token, possibly wrapped with field context.
    pub fn is_format(&self) -> bool {
        match self {
            Self::InvalidVaultFormat(_)
            | Self::TokenDecode(_)
            | Self::TokenTooShort { .. }
            | Self::InvalidUtf8(_) => true,
            Self::SecretField { source, .. } => source.is_format(),
            _ => false,
        }
    }
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, EnvyError>;
