//! Key Vault object identifiers.
//!
//! Listing responses identify items by URL:
//! `https://{vault}/secrets/{name}` and `https://{vault}/secrets/{name}/{version}`.

use crate::error::StoreError;
use reqwest::Url;

fn path_segments(id: &str) -> Result<Vec<String>, StoreError> {
    let url = Url::parse(id).map_err(|e| StoreError::InvalidId(format!("{id}: {e}")))?;
    Ok(url
        .path()
        .trim_matches('/')
        .split('/')
        .map(str::to_string)
        .collect())
}

/// Secret name from a secret or secret-version identifier
///
/// # Errors
/// Returns `StoreError::InvalidId` unless the path is `/secrets/{name}[/...]`
pub fn secret_name_from_id(id: &str) -> Result<String, StoreError> {
    match path_segments(id)?.as_slice() {
        [kind, name, ..] if kind == "secrets" && !name.is_empty() => Ok(name.clone()),
        _ => Err(StoreError::InvalidId(format!(
            "unexpected secret ID format: {id}"
        ))),
    }
}

/// Version token from a secret-version identifier
///
/// # Errors
/// Returns `StoreError::InvalidId` unless the path is `/secrets/{name}/{version}`
pub fn secret_version_from_id(id: &str) -> Result<String, StoreError> {
    match path_segments(id)?.as_slice() {
        [kind, name, version, ..] if kind == "secrets" && !name.is_empty() && !version.is_empty() => {
            Ok(version.clone())
        }
        _ => Err(StoreError::InvalidId(format!(
            "unexpected secret version ID format: {id}"
        ))),
    }
}
