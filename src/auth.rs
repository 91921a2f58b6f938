//! # Credentials
//!
//! Resolves the `TokenCredential` used for every Key Vault call.
//!
//! Candidates are tried in order:
//! 1. A static bearer token (`KEY_VAULT_STATIC_TOKEN`), for emulators and mock servers
//! 2. Service principal client secret (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`)
//! 3. Workload identity (`AZURE_FEDERATED_TOKEN_FILE`)
//! 4. Azure CLI
//! 5. Managed identity
//!
//! Each candidate is asked for a Key Vault token and the first one that
//! answers wins.

use crate::constants::KEY_VAULT_SCOPE;
use anyhow::{bail, Result};
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential,
    WorkloadIdentityCredential,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// How long a single credential candidate may take to produce a token
const TOKEN_CHECK_TIMEOUT: Duration = Duration::from_secs(20);

/// Credential that always hands out the same bearer token
#[derive(Debug)]
pub struct StaticTokenCredential {
    token: Zeroizing<String>,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(AccessToken::new(
            Secret::new(self.token.to_string()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

/// Credential material read from the environment
#[derive(Default, Clone)]
pub struct CredentialSettings {
    pub static_token: Option<Zeroizing<String>>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<Zeroizing<String>>,
    pub federated_token_file: Option<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<Zeroizing<String>>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialSettings")
            .field("static_token", &redact(&self.static_token))
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("federated_token_file", &self.federated_token_file)
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl CredentialSettings {
    pub fn from_env() -> Self {
        Self {
            static_token: non_empty_env("KEY_VAULT_STATIC_TOKEN").map(Zeroizing::new),
            tenant_id: non_empty_env("AZURE_TENANT_ID"),
            client_id: non_empty_env("AZURE_CLIENT_ID"),
            client_secret: non_empty_env("AZURE_CLIENT_SECRET").map(Zeroizing::new),
            federated_token_file: non_empty_env("AZURE_FEDERATED_TOKEN_FILE"),
        }
    }

    fn client_secret_parts(&self) -> Option<(&str, &str, &str)> {
        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant), Some(client), Some(secret)) => {
                Some((tenant.as_str(), client.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

type Candidate = (&'static str, azure_core::Result<Arc<dyn TokenCredential>>);

fn candidates(settings: &CredentialSettings) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();

    if let Some((tenant_id, client_id, client_secret)) = settings.client_secret_parts() {
        candidates.push((
            "client_secret",
            ClientSecretCredential::new(
                tenant_id,
                client_id.to_string(),
                Secret::new(client_secret.to_string()),
                None,
            )
            .map(|credential| credential as Arc<dyn TokenCredential>),
        ));
    }

    if settings.federated_token_file.is_some() {
        candidates.push((
            "workload_identity",
            WorkloadIdentityCredential::new(None)
                .map(|credential| credential as Arc<dyn TokenCredential>),
        ));
    }

    candidates.push((
        "azure_cli",
        AzureCliCredential::new(None).map(|credential| credential as Arc<dyn TokenCredential>),
    ));
    candidates.push((
        "managed_identity",
        ManagedIdentityCredential::new(None)
            .map(|credential| credential as Arc<dyn TokenCredential>),
    ));

    candidates
}

/// Pick the first credential that can produce a Key Vault token
///
/// # Errors
/// Returns an error naming every candidate's failure when none succeeds
pub async fn resolve_credential(settings: &CredentialSettings) -> Result<Arc<dyn TokenCredential>> {
    if let Some(token) = &settings.static_token {
        info!("Using static bearer token for Key Vault");
        return Ok(Arc::new(StaticTokenCredential::new(token.as_str())));
    }

    let mut failures = Vec::new();
    for (kind, candidate) in candidates(settings) {
        let credential = match candidate {
            Ok(credential) => credential,
            Err(e) => {
                debug!(credential.kind = kind, error = %e, "Credential unavailable");
                failures.push(format!("{kind}: {e}"));
                continue;
            }
        };

        let token_request = credential.get_token(&[KEY_VAULT_SCOPE], Some(TokenRequestOptions::default()));
        match tokio::time::timeout(TOKEN_CHECK_TIMEOUT, token_request).await {
            Ok(Ok(_)) => {
                info!(credential.kind = kind, "Authenticated to Azure");
                return Ok(credential);
            }
            Ok(Err(e)) => {
                debug!(credential.kind = kind, error = %e, "Credential could not get a token");
                failures.push(format!("{kind}: {e}"));
            }
            Err(_) => {
                warn!(credential.kind = kind, "Credential token request timed out");
                failures.push(format!("{kind}: timed out after {}s", TOKEN_CHECK_TIMEOUT.as_secs()));
            }
        }
    }

    bail!("no Azure credential available ({})", failures.join("; "))
}
