//! Vault module — the encrypted project/secret document.
//!
//! This module provides:
//! - `Project`, `Secret`, `SecretVersion` and name validators (`model`)
//! - The on-disk JSON document and its parser (`format`)
//! - Crash-safe temp-file + rename commits (`writer`)
//! - Field-level encryption of the project tree (`codec`)
//! - `VaultStore`, which ties them together under the lock (`store`)

pub mod codec;
pub mod format;
pub mod model;
pub mod store;
pub mod writer;

// Re-export the most commonly used items.
pub use codec::{decrypt_document, encrypt_document};
pub use format::{VaultDocument, SCHEMA_VERSION};
pub use model::{
    validate_key_name, validate_project_name, Environment, Project, Secret, SecretVersion,
};
pub use store::VaultStore;
