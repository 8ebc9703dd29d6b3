//! Integration tests for `VaultStore`: initialize, load, save, backup.

use std::fs;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use envy::lock::FileLock;
use envy::vault::VaultDocument;
use envy::{Environment, EnvyError, Project, Secret, StoreConfig, VaultStore};
use tempfile::TempDir;

/// Helper: a store rooted in a fresh temp dir with cheap KDF settings.
fn vault() -> (TempDir, VaultStore) {
    let dir = TempDir::new().expect("create temp dir");
    let config = StoreConfig {
        argon2_memory_kib: 8_192,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..StoreConfig::in_dir(&dir.path().join("data"))
    };
    (dir, VaultStore::new(config))
}

fn read_raw(store: &VaultStore) -> VaultDocument {
    VaultDocument::from_bytes(&fs::read(store.path()).unwrap()).unwrap()
}

fn sample_tree() -> Vec<Project> {
    let mut stripe = Secret::new("Stripe", "STRIPE_KEY", "sk_test_1", "import");
    stripe.replace_value("sk_test_2", "tui-edit");
    stripe.replace_value("sk_test_3", "tui-edit");

    let mut api = Project::new("api", Environment::Prod);
    api.keys.push(stripe);
    api.keys
        .push(Secret::new("Database", "DATABASE_URL", "postgres://db", "import"));

    let mut web = Project::new("web", Environment::Stage);
    web.keys.push(Secret::new("Empty", "EMPTY", "", "import"));

    vec![api, web]
}

// ---------------------------------------------------------------------------
// First run and initialization
// ---------------------------------------------------------------------------

#[test]
fn initialize_then_load_empty_vault() {
    let (_dir, store) = vault();
    assert!(store.is_first_run().unwrap());

    store.initialize("correct-horse").expect("initialize");
    assert!(!store.is_first_run().unwrap());
    assert!(read_raw(&store).projects.is_empty());

    let (projects, key) = store.load("correct-horse").expect("load");
    assert!(projects.is_empty());
    assert_eq!(key.as_bytes().len(), 32);
}

#[test]
fn load_with_wrong_password_is_authentication_error() {
    let (_dir, store) = vault();
    store.initialize("correct-horse").unwrap();

    let err = store.load("wrong-password").unwrap_err();
    assert!(matches!(err, EnvyError::AuthenticationFailed));
    assert!(err.is_authentication());
}

#[test]
fn initialize_twice_never_overwrites() {
    let (_dir, store) = vault();
    store.initialize("first").unwrap();
    let before = fs::read(store.path()).unwrap();

    let err = store.initialize("second").unwrap_err();
    assert!(matches!(err, EnvyError::VaultAlreadyExists(_)));
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert!(store.load("first").is_ok());
}

#[test]
fn load_missing_vault_is_not_found() {
    let (_dir, store) = vault();
    let err = store.load("anything").unwrap_err();
    assert!(matches!(err, EnvyError::VaultNotFound(_)));
}

// ---------------------------------------------------------------------------
// Save / load round-trip
// ---------------------------------------------------------------------------

#[test]
fn save_and_reload_reproduces_tree() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();

    let tree = sample_tree();
    store.save(&tree, &key).expect("save");

    let (loaded, _) = store.load("pw").expect("reload");
    assert_eq!(loaded, tree);
    assert_eq!(loaded[0].keys[0].history.len(), 2);
}

#[test]
fn values_are_ciphertext_on_disk_and_names_are_not() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();
    store.save(&sample_tree(), &key).unwrap();

    let text = fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("STRIPE_KEY"));
    assert!(text.contains("\"environment\": \"prod\""));
    assert!(!text.contains("sk_test_"));
    assert!(!text.contains("postgres://db"));
}

#[test]
fn save_preserves_salt_and_auth_check() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let original = read_raw(&store);

    let (_, key) = store.load("pw").unwrap();
    store.save(&sample_tree(), &key).unwrap();
    store.save(&[], &key).unwrap();

    let after = read_raw(&store);
    assert_eq!(after.salt, original.salt);
    assert_eq!(after.auth_check, original.auth_check);
    assert_eq!(after.kdf, original.kdf);
    assert_eq!(after.schema_version, original.schema_version);
}

#[test]
fn every_save_uses_fresh_nonces() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();

    store.save(&sample_tree(), &key).unwrap();
    let first = read_raw(&store).projects[0].keys[0].current.value.clone();
    store.save(&sample_tree(), &key).unwrap();
    let second = read_raw(&store).projects[0].keys[0].current.value.clone();

    assert_ne!(first, second);
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn tampered_value_fails_load_with_location() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();
    store.save(&sample_tree(), &key).unwrap();

    // Swap two valid tokens' payload by re-encrypting under a foreign key.
    let mut doc = read_raw(&store);
    let foreign = envy::VaultKey::from_bytes([0x99u8; 32]);
    doc.projects[1].keys[0].current.value = envy::crypto::encrypt(&foreign, b"x").unwrap();
    fs::write(store.path(), doc.to_bytes().unwrap()).unwrap();

    let err = store.load("pw").unwrap_err();
    assert!(err.is_integrity());
    let message = err.to_string();
    assert!(message.contains("web"));
    assert!(message.contains("EMPTY"));
}

#[test]
fn malformed_document_is_format_error() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    fs::write(store.path(), b"{\"schema_version\": 1, \"salt\": ").unwrap();

    let err = store.load("pw").unwrap_err();
    assert!(err.is_format());
    assert!(!err.is_authentication());
}

#[test]
fn out_of_range_kdf_params_fail_fast_as_format_error() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();

    let mut doc = read_raw(&store);
    doc.kdf.as_mut().expect("kdf pinned at init").iterations = u32::MAX;
    fs::write(store.path(), doc.to_bytes().unwrap()).unwrap();

    let (tx, rx) = mpsc::channel();
    let loader = {
        let store = store.clone();
        thread::spawn(move || {
            let result = store.load("pw").map(|_| ());
            tx.send(result).unwrap();
        })
    };

    let result = rx
        .recv_timeout(Duration::from_secs(20))
        .expect("load returned instead of running the KDF");
    let err = result.unwrap_err();
    assert!(err.is_format());
    assert!(!err.is_authentication());
    loader.join().unwrap();
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_saves_leave_one_complete_document() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();
    let key = Arc::new(key);

    let tree_a = sample_tree();
    let tree_b = vec![Project::new("solo", Environment::Dev)];

    let handles: Vec<_> = [tree_a.clone(), tree_b.clone()]
        .into_iter()
        .map(|tree| {
            let store = store.clone();
            let key = Arc::clone(&key);
            thread::spawn(move || {
                for _ in 0..10 {
                    store.save(&tree, &key).expect("save");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let (loaded, _) = store.load("pw").unwrap();
    assert!(loaded == tree_a || loaded == tree_b);
}

#[test]
fn save_waits_for_external_lock_holder() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();

    let mut held = FileLock::acquire(&store.config().lock_path).unwrap();
    let saver = {
        let store = store.clone();
        thread::spawn(move || store.save(&sample_tree(), &key))
    };

    thread::sleep(Duration::from_millis(200));
    assert!(read_raw(&store).projects.is_empty(), "save ran while locked");

    held.release().unwrap();
    saver.join().unwrap().expect("save after release");
    assert_eq!(read_raw(&store).projects.len(), 2);
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

#[test]
fn backup_is_byte_for_byte_copy() {
    let (_dir, store) = vault();
    store.initialize("pw").unwrap();
    let (_, key) = store.load("pw").unwrap();
    store.save(&sample_tree(), &key).unwrap();

    let backup = store.create_backup().unwrap().expect("backup path");
    assert_eq!(backup, store.config().backup_path());
    assert_eq!(fs::read(&backup).unwrap(), fs::read(store.path()).unwrap());
}

#[test]
fn backup_without_vault_is_noop() {
    let (_dir, store) = vault();
    assert!(store.create_backup().unwrap().is_none());
    assert!(!store.config().backup_path().exists());
}

#[test]
fn two_vaults_coexist_in_one_process() {
    let (_d1, one) = vault();
    let (_d2, two) = vault();
    one.initialize("alpha").unwrap();
    two.initialize("beta").unwrap();

    assert!(one.load("alpha").is_ok());
    assert!(two.load("beta").is_ok());
    assert!(one.load("beta").unwrap_err().is_authentication());
}
