//! Field-level encryption of the project tree.
//!
//! Only `SecretVersion::value` is transformed; names, environments,
//! titles and timestamps pass through untouched.  Both directions build
//! a fresh tree and bail out on the first failing field, so a caller
//! never receives a half-converted tree.

use zeroize::Zeroize;

use super::model::{Project, Secret, SecretVersion};
use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::VaultKey;
use crate::errors::{EnvyError, Result};

/// Return a copy of `projects` with every secret value encrypted.
pub fn encrypt_document(projects: &[Project], key: &VaultKey) -> Result<Vec<Project>> {
    map_values(projects, "encrypt", |value| encrypt(key, value.as_bytes()))
}

/// Return a copy of `projects` with every secret value decrypted.
///
/// The error names the project and secret whose value failed, wrapping
/// the underlying cipher error (integrity, decode or length).
pub fn decrypt_document(projects: &[Project], key: &VaultKey) -> Result<Vec<Project>> {
    map_values(projects, "decrypt", |token| {
        let bytes = decrypt(key, token)?;
        String::from_utf8(bytes).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            EnvyError::InvalidUtf8("secret value is not valid UTF-8".into())
        })
    })
}

fn map_values<F>(projects: &[Project], op: &'static str, f: F) -> Result<Vec<Project>>
where
    F: Fn(&str) -> Result<String>,
{
    projects
        .iter()
        .map(|project| {
            let keys = project
                .keys
                .iter()
                .map(|secret| map_secret(project, secret, op, &f))
                .collect::<Result<Vec<_>>>()?;
            Ok(Project {
                name: project.name.clone(),
                environment: project.environment,
                keys,
            })
        })
        .collect()
}

fn map_secret<F>(project: &Project, secret: &Secret, op: &'static str, f: &F) -> Result<Secret>
where
    F: Fn(&str) -> Result<String>,
{
    let current = map_version(&secret.current, f)
        .map_err(|e| field_error(op, "current", project, secret, e))?;
    let history = secret
        .history
        .iter()
        .map(|version| map_version(version, f))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| field_error(op, "history", project, secret, e))?;

    Ok(Secret {
        display_title: secret.display_title.clone(),
        name: secret.name.clone(),
        current,
        history,
    })
}

fn field_error(
    op: &'static str,
    field: &'static str,
    project: &Project,
    secret: &Secret,
    source: EnvyError,
) -> EnvyError {
    EnvyError::SecretField {
        op,
        field,
        project: project.name.clone(),
        environment: project.environment.to_string(),
        secret: secret.name.clone(),
        source: Box::new(source),
    }
}

fn map_version<F>(version: &SecretVersion, f: &F) -> Result<SecretVersion>
where
    F: Fn(&str) -> Result<String>,
{
    Ok(SecretVersion {
        value: f(&version.value)?,
        created_at: version.created_at,
        created_by: version.created_by.clone(),
    })
}
