use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{EnvyError, Result};

/// Where the vault lives and how new vaults derive their key.
///
/// Passed explicitly to `VaultStore::new`, so several vaults can coexist
/// in one process.  Every field has a default, so an empty (or missing)
/// config file works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Encrypted vault document (default: `~/.envy/keys.json`).
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,

    /// Empty marker file used for the writer lock (default: `~/.envy/.lock`).
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    /// Argon2 memory cost in KiB for new vaults (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count for new vaults (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree for new vaults (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

const VAULT_FILE_NAME: &str = "keys.json";
const LOCK_FILE_NAME: &str = ".lock";

fn default_vault_path() -> PathBuf {
    default_data_dir().join(VAULT_FILE_NAME)
}

fn default_lock_path() -> PathBuf {
    default_data_dir().join(LOCK_FILE_NAME)
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

/// `~/.envy` on Unix-likes, `%APPDATA%\envy` on Windows.
pub fn default_data_dir() -> PathBuf {
    if cfg!(windows) {
        if let Some(dir) = dirs::data_dir() {
            return dir.join("envy");
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".envy")
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            lock_path: default_lock_path(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl StoreConfig {
    /// Config with the vault and lock files inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            vault_path: dir.join(VAULT_FILE_NAME),
            lock_path: dir.join(LOCK_FILE_NAME),
            ..Self::default()
        }
    }

    /// Load settings from a TOML file.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)?;

        toml::from_str(&contents).map_err(|e| {
            EnvyError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Path `create_backup` copies the vault to.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.vault_path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
