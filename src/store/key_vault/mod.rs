//! # Azure Key Vault Store
//!
//! [`SecretStore`] sessions over the Azure Key Vault Secrets SDK.
//!
//! This module provides functionality to:
//! - List secret names and secret versions, one page per call
//! - Read a secret's value and metadata, current or at a version
//! - Write a secret (value, content type, enabled flag, tags)
//!
//! Requests carry a bearer token from an `azure_core` [`TokenCredential`].

mod ids;
mod listings;
mod operations;

pub use ids::{secret_name_from_id, secret_version_from_id};

use self::listings::Listings;
use crate::constants::DEFAULT_KEY_VAULT_DNS_SUFFIX;
use crate::error::StoreError;
use crate::store::{SecretStore, StoreConnector};
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_security_keyvault_secrets::models::SecretProperties;
use azure_security_keyvault_secrets::SecretClient;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

/// Session to one Key Vault
pub struct KeyVaultStore {
    identity: String,
    vault_url: Url,
    client: SecretClient,
    listings: Listings<SecretProperties>,
}

impl std::fmt::Debug for KeyVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultStore")
            .field("identity", &self.identity)
            .field("vault_url", &self.vault_url.as_str())
            .finish_non_exhaustive()
    }
}

impl KeyVaultStore {
    /// # Errors
    /// Returns an error if the SDK rejects the vault URL
    pub fn new(
        identity: impl Into<String>,
        vault_url: Url,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, StoreError> {
        let client = SecretClient::new(vault_url.as_str(), credential, None)?;
        Ok(Self {
            identity: identity.into(),
            vault_url,
            client,
            listings: Listings::default(),
        })
    }

    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }
}

/// Resolve a vault identity to its base URL
///
/// A bare vault name becomes `https://{name}.{dns_suffix}/`. An identity that
/// already is an `http(s)://` URL is used as-is, with a trailing slash added.
///
/// # Errors
/// Returns `StoreError::InvalidVault` for empty identities, names with
/// characters Key Vault does not allow, and unparseable URLs.
pub fn resolve_vault_url(identity: &str, dns_suffix: &str) -> Result<Url, StoreError> {
    let identity = identity.trim();
    let invalid = |reason: String| StoreError::InvalidVault {
        identity: identity.to_string(),
        reason,
    };

    if identity.is_empty() {
        return Err(invalid("vault identity is empty".to_string()));
    }

    let raw = if identity.starts_with("https://") || identity.starts_with("http://") {
        if identity.ends_with('/') {
            identity.to_string()
        } else {
            format!("{identity}/")
        }
    } else {
        if !identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid(
                "vault names may only contain letters, digits and hyphens".to_string(),
            ));
        }
        format!("https://{identity}.{dns_suffix}/")
    };

    Url::parse(&raw).map_err(|e| invalid(e.to_string()))
}

/// Opens [`KeyVaultStore`] sessions sharing one credential
pub struct KeyVaultConnector {
    credential: Arc<dyn TokenCredential>,
    dns_suffix: String,
}

impl std::fmt::Debug for KeyVaultConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultConnector")
            .field("dns_suffix", &self.dns_suffix)
            .finish_non_exhaustive()
    }
}

impl KeyVaultConnector {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            dns_suffix: DEFAULT_KEY_VAULT_DNS_SUFFIX.to_string(),
        }
    }

    /// Use a sovereign-cloud suffix such as `vault.azure.cn`
    #[must_use]
    pub fn with_dns_suffix(mut self, dns_suffix: impl Into<String>) -> Self {
        self.dns_suffix = dns_suffix.into();
        self
    }
}

#[async_trait]
impl StoreConnector for KeyVaultConnector {
    async fn connect(&self, identity: &str) -> Result<Arc<dyn SecretStore>, StoreError> {
        let vault_url = resolve_vault_url(identity, &self.dns_suffix)?;
        debug!(
            vault_name = identity,
            vault_url = %vault_url,
            "Opened Key Vault session"
        );
        let store = KeyVaultStore::new(identity.trim(), vault_url, Arc::clone(&self.credential))?;
        Ok(Arc::new(store))
    }
}
