//! Vault location and KDF settings.

pub mod settings;

pub use settings::{default_data_dir, StoreConfig};
