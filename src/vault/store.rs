//! High-level vault operations used by the UI and command layers.
//!
//! `VaultStore` composes the lock, the atomic writer and the codec
//! around the on-disk document.  It holds no session state: every call
//! reads what it needs from disk, and every write is bracketed by its
//! own lock acquisition.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::crypto::kdf::{derive_key_with_params, generate_salt};
use crate::crypto::keys::{generate_auth_check, verify_auth_check, VaultKey};
use crate::errors::{EnvyError, Result};
use crate::lock::FileLock;

use super::codec::{decrypt_document, encrypt_document};
use super::format::{self, StoredArgon2Params, VaultDocument, SCHEMA_VERSION};
use super::model::Project;
use super::writer;

/// Handle on one vault file and its lock file.
#[derive(Debug, Clone)]
pub struct VaultStore {
    config: StoreConfig,
}

impl VaultStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path to the vault document on disk.
    pub fn path(&self) -> &Path {
        &self.config.vault_path
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// `true` when no vault file exists yet.
    pub fn is_first_run(&self) -> Result<bool> {
        match fs::metadata(self.path()) {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a new, empty vault protected by `password`.
    ///
    /// Generates the salt, derives the key, stores the auth check and
    /// writes the document under the lock.  Never overwrites an existing
    /// vault.
    pub fn initialize(&self, password: &str) -> Result<()> {
        // Cheap check first so we skip the KDF when the vault is already there.
        if !self.is_first_run()? {
            return Err(EnvyError::VaultAlreadyExists(self.path().to_path_buf()));
        }

        let salt = generate_salt()?;
        let params = self.config.argon2_params();
        let key = derive_key_with_params(password.as_bytes(), &salt, &params)?;

        let document = VaultDocument {
            schema_version: SCHEMA_VERSION,
            salt: salt.to_vec(),
            auth_check: generate_auth_check(&key)?,
            kdf: Some(StoredArgon2Params::from(params)),
            projects: Vec::new(),
        };

        let mut lock = FileLock::acquire(&self.config.lock_path)?;
        // Another process may have initialized while we were deriving.
        if !self.is_first_run()? {
            return Err(EnvyError::VaultAlreadyExists(self.path().to_path_buf()));
        }
        writer::commit(&document, self.path())?;
        release_after_commit(&mut lock);

        info!(path = %self.path().display(), "Initialized vault");
        Ok(())
    }

    /// Unlock the vault and return the decrypted projects plus the key.
    ///
    /// A wrong password fails with `AuthenticationFailed` before any
    /// value is decrypted.  Reads take no lock: the writer only ever
    /// renames complete documents into place.
    pub fn load(&self, password: &str) -> Result<(Vec<Project>, VaultKey)> {
        let document = format::read_document(self.path())?;

        let key = derive_key_with_params(
            password.as_bytes(),
            &document.salt,
            &document.argon2_params(),
        )?;

        if !verify_auth_check(&key, &document.auth_check) {
            warn!(path = %self.path().display(), "Vault authentication failed");
            return Err(EnvyError::AuthenticationFailed);
        }

        let projects = decrypt_document(&document.projects, &key)?;
        debug!(
            path = %self.path().display(),
            projects = projects.len(),
            "Loaded vault"
        );
        Ok((projects, key))
    }

    /// Persist `projects`, re-encrypted under `key`.
    ///
    /// Blocks until the vault lock is free.  Salt, auth check and KDF
    /// parameters are copied from the document currently on disk, never
    /// from the caller.  A key that does not match that document is
    /// refused so a stale session cannot write values nobody can decrypt.
    pub fn save(&self, projects: &[Project], key: &VaultKey) -> Result<()> {
        let lock = FileLock::acquire(&self.config.lock_path)?;
        self.save_locked(lock, projects, key)
    }

    /// Like `save`, but fails with `LockUnavailable` instead of waiting
    /// when another writer holds the lock.
    pub fn try_save(&self, projects: &[Project], key: &VaultKey) -> Result<()> {
        let lock = FileLock::try_acquire(&self.config.lock_path)?
            .ok_or_else(|| EnvyError::LockUnavailable(self.config.lock_path.clone()))?;
        self.save_locked(lock, projects, key)
    }

    fn save_locked(&self, mut lock: FileLock, projects: &[Project], key: &VaultKey) -> Result<()> {
        let existing = format::read_document(self.path())?;
        if !verify_auth_check(key, &existing.auth_check) {
            warn!(
                path = %self.path().display(),
                "Refusing save with a key that does not match the vault"
            );
            return Err(EnvyError::AuthenticationFailed);
        }

        let document = VaultDocument {
            projects: encrypt_document(projects, key)?,
            ..existing
        };

        writer::commit(&document, self.path())?;
        release_after_commit(&mut lock);

        info!(
            path = %self.path().display(),
            projects = document.projects.len(),
            "Saved vault"
        );
        Ok(())
    }

    /// Copy the vault file byte-for-byte to `<vault>.backup`.
    ///
    /// Nothing is decrypted and the lock is not taken, so only call this
    /// between saves.  Returns `None` when there is no vault to back up.
    pub fn create_backup(&self) -> Result<Option<PathBuf>> {
        let data = match fs::read(self.path()) {
            Ok(data) => Zeroizing::new(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let backup_path = self.config.backup_path();
        writer::write_private(&backup_path, &data)?;

        info!(backup = %backup_path.display(), "Created vault backup");
        Ok(Some(backup_path))
    }
}

/// The document is already committed, so an unlock failure must not
/// turn a completed write into an error.  Closing the handle still
/// drops the OS lock.
fn release_after_commit(lock: &mut FileLock) {
    if let Err(e) = lock.release() {
        warn!(path = %lock.path().display(), error = %e, "Failed to release vault lock after commit");
    }
}
