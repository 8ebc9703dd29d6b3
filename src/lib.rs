//! Storage and crypto engine for a local encrypted secret vault.
//!
//! One vault file holds projects, each with named secrets and their
//! version history.  Secret values are encrypted field by field with
//! AES-256-GCM under a key derived from the user's password with
//! Argon2id.  Writes are atomic and serialized across processes by a
//! lock file.
//!
//! ```no_run
//! use envy::{Environment, Project, Secret, StoreConfig, VaultStore};
//!
//! # fn main() -> envy::Result<()> {
//! let store = VaultStore::new(StoreConfig::default());
//! if store.is_first_run()? {
//!     store.initialize("correct-horse")?;
//! }
//!
//! let (mut projects, key) = store.load("correct-horse")?;
//! let mut api = Project::new("api", Environment::Dev);
//! api.keys.push(Secret::new("Stripe", "STRIPE_KEY", "sk_test_123", "example"));
//! projects.push(api);
//! store.save(&projects, &key)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod errors;
pub mod lock;
pub mod vault;

pub use config::StoreConfig;
pub use crypto::VaultKey;
pub use errors::{EnvyError, Result};
pub use vault::{Environment, Project, Secret, SecretVersion, VaultStore};
