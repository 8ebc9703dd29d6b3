//! Project / secret tree persisted in the vault.
//!
//! The same types carry plaintext values in memory and ciphertext
//! tokens on disk; only `SecretVersion::value` ever changes between the
//! two.  Field names match the on-disk JSON document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{EnvyError, Result};

/// Longest accepted project or key name, in bytes.
const MAX_NAME_LEN: usize = 256;

/// Deployment stage a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Dev,
    Stage,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Dev => "dev",
            Self::Stage => "stage",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = EnvyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "prod" => Ok(Self::Prod),
            "dev" => Ok(Self::Dev),
            "stage" => Ok(Self::Stage),
            other => Err(EnvyError::InvalidName(format!(
                "invalid environment '{other}' (must be prod, dev, or stage)"
            ))),
        }
    }
}

/// One value of a secret at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretVersion {
    /// Plaintext in memory, base64 ciphertext token on disk.
    pub value: String,
    pub created_at: DateTime<Utc>,
    /// Short label of what wrote this version (e.g. "tui-edit", "import").
    pub created_by: String,
}

impl SecretVersion {
    pub fn new(value: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }
}

/// A named secret with its current value and every value it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(rename = "title")]
    pub display_title: String,
    /// Unique within a project.
    #[serde(rename = "key")]
    pub name: String,
    pub current: SecretVersion,
    /// Superseded versions, oldest first.
    #[serde(default)]
    pub history: Vec<SecretVersion>,
}

impl Secret {
    pub fn new(
        display_title: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            display_title: display_title.into(),
            name: name.into(),
            current: SecretVersion::new(value, created_by),
            history: Vec::new(),
        }
    }

    /// Replace the current value, pushing the outgoing one onto `history`.
    pub fn replace_value(&mut self, value: impl Into<String>, created_by: impl Into<String>) {
        let outgoing = std::mem::replace(&mut self.current, SecretVersion::new(value, created_by));
        self.history.push(outgoing);
    }
}

/// A named set of secrets for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub environment: Environment,
    #[serde(default)]
    pub keys: Vec<Secret>,
}

impl Project {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
            keys: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation (used by the layer that edits the tree)
// ---------------------------------------------------------------------------

/// Project names must be non-empty after trimming and at most 256 bytes.
pub fn validate_project_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EnvyError::InvalidName("project name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EnvyError::InvalidName(format!(
            "project name too long (max {MAX_NAME_LEN} characters)"
        )));
    }
    Ok(())
}

/// Key names additionally may not contain `=` or line breaks, since they
/// end up as `NAME=value` environment entries.
pub fn validate_key_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EnvyError::InvalidName("key name cannot be empty".into()));
    }
    if name.contains(['=', '\n', '\r']) {
        return Err(EnvyError::InvalidName(
            "key name cannot contain =, newline, or carriage return".into(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EnvyError::InvalidName(format!(
            "key name too long (max {MAX_NAME_LEN} characters)"
        )));
    }
    Ok(())
}
