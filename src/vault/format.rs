//! On-disk vault document.
//!
//! The vault is a pretty-printed JSON document:
//!
//! ```text
//! { "schema_version": 1,
//!   "salt": "<base64, 16 bytes>",
//!   "auth_check": "<base64 HMAC tag>",
//!   "kdf": { "memory_kib": .., "iterations": .., "parallelism": .. },
//!   "projects": [ { "name", "environment", "keys": [
//!       { "title", "key", "current": { "value", "created_at", "created_by" },
//!         "history": [ ... ] } ] } ] }
//! ```
//!
//! Only `value` fields are encrypted, so names and timestamps stay
//! inspectable with ordinary tools.

use std::fs;
use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::model::Project;
use crate::crypto::{Argon2Params, SALT_LEN};
use crate::errors::{EnvyError, Result};

/// Current document schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Argon2 parameters pinned in the document at creation so `load` uses
/// exactly what `initialize` used.  Optional: defaults when missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArgon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<Argon2Params> for StoredArgon2Params {
    fn from(p: Argon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

impl From<StoredArgon2Params> for Argon2Params {
    fn from(p: StoredArgon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

/// Root of the vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultDocument {
    pub schema_version: u32,

    /// Argon2id salt, set once at creation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Password verifier, set once at creation.
    pub auth_check: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<StoredArgon2Params>,

    #[serde(default)]
    pub projects: Vec<Project>,
}

impl VaultDocument {
    /// KDF parameters to re-derive the key with.
    pub fn argon2_params(&self) -> Argon2Params {
        self.kdf.map(Argon2Params::from).unwrap_or_default()
    }

    /// Serialize to the on-disk representation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| EnvyError::SerializationError(format!("vault document: {e}")))
    }

    /// Parse and validate the on-disk representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc: VaultDocument = serde_json::from_slice(data).map_err(|e| {
            EnvyError::InvalidVaultFormat(format!("failed to parse vault (corrupted?): {e}"))
        })?;

        if doc.schema_version != SCHEMA_VERSION {
            return Err(EnvyError::InvalidVaultFormat(format!(
                "unsupported schema version {}, expected {SCHEMA_VERSION}",
                doc.schema_version
            )));
        }
        if doc.salt.len() != SALT_LEN {
            return Err(EnvyError::InvalidVaultFormat(format!(
                "salt must be {SALT_LEN} bytes (got {})",
                doc.salt.len()
            )));
        }
        if doc.auth_check.is_empty() {
            return Err(EnvyError::InvalidVaultFormat("missing auth_check".into()));
        }
        if let Some(kdf) = doc.kdf {
            Argon2Params::from(kdf)
                .check()
                .map_err(|e| EnvyError::InvalidVaultFormat(format!("kdf: {e}")))?;
        }

        Ok(doc)
    }
}

/// Read the vault document at `path`.
pub fn read_document(path: &Path) -> Result<VaultDocument> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EnvyError::VaultNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    VaultDocument::from_bytes(&data)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
