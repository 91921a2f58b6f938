//! [`SecretStore`] over the Key Vault Secrets SDK.

use super::ids::{secret_name_from_id, secret_version_from_id};
use super::listings::{take, Chunk, ItemStream};
use super::KeyVaultStore;
use crate::constants::KEY_VAULT_PAGE_SIZE;
use crate::error::StoreError;
use crate::observability::metrics;
use crate::store::{Page, SecretRecord, SecretStore, VersionRef};
use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_security_keyvault_secrets::models::{
    Secret, SecretAttributes, SecretClientGetSecretOptions, SecretProperties, SetSecretParameters,
};
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

const DISABLED_CODE: &str = "SecretDisabled";

/// Status and error code of a failed HTTP exchange
fn http_failure(error: &azure_core::Error) -> Option<(u16, String)> {
    match error.kind() {
        ErrorKind::HttpResponse {
            status, error_code, ..
        } => Some((u16::from(*status), error_code.clone().unwrap_or_default())),
        _ => None,
    }
}

/// Map an SDK error for secret `name` to a [`StoreError`]
///
/// A 403 on a disabled secret becomes `StoreError::Disabled`. The service
/// reports it either as the `SecretDisabled` code or only in the message.
pub(super) fn classify(error: azure_core::Error, name: &str) -> StoreError {
    let Some((status, code)) = http_failure(&error) else {
        return StoreError::Azure(error);
    };
    let message = error.to_string();

    if status == 403
        && (code == DISABLED_CODE || message.to_ascii_lowercase().contains("disabled"))
    {
        return StoreError::Disabled {
            name: name.to_string(),
        };
    }

    StoreError::Http {
        status,
        code,
        message,
    }
}

fn record_outcome<T>(result: &Result<T, StoreError>, operation: &str, start: Instant) {
    match result {
        Ok(_) => metrics::record_store_operation(operation, start.elapsed().as_secs_f64()),
        Err(_) => metrics::increment_store_operation_errors(operation),
    }
}

impl KeyVaultStore {
    /// Next page of a listing; `open` starts it when there is no token
    async fn listing_page(
        &self,
        next: Option<String>,
        name: &str,
        open: impl FnOnce() -> azure_core::Result<ItemStream<SecretProperties>>,
    ) -> Result<(Vec<SecretProperties>, Option<String>), StoreError> {
        let mut stream = match next {
            Some(token) => self.listings.resume(&token).await?,
            None => open().map_err(|e| classify(e, name))?,
        };

        let Chunk { items, exhausted } = take(&mut stream, KEY_VAULT_PAGE_SIZE)
            .await
            .map_err(|e| classify(e, name))?;
        let next = if exhausted {
            None
        } else {
            Some(self.listings.park(stream).await)
        };
        Ok((items, next))
    }
}

#[async_trait]
impl SecretStore for KeyVaultStore {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn list_secret_names(&self, next: Option<String>) -> Result<Page<String>, StoreError> {
        let span = info_span!("keyvault.list_secrets", vault.name = %self.identity);
        let start = Instant::now();

        let result: Result<_, StoreError> = async {
            let (chunk, next) = self
                .listing_page(next, "", || {
                    Ok(self.client.list_secret_properties(None)?.boxed())
                })
                .await?;
            let items = chunk
                .into_iter()
                .filter_map(|properties| match properties.id {
                    Some(id) => Some(secret_name_from_id(&id)),
                    None => {
                        debug!("Skipping listed secret without an id");
                        None
                    }
                })
                .collect();
            Ok(Page { items, next })
        }
        .instrument(span)
        .await;

        record_outcome(&result, "list_secrets", start);
        result
    }

    async fn list_secret_versions(
        &self,
        name: &str,
        next: Option<String>,
    ) -> Result<Page<VersionRef>, StoreError> {
        let span = info_span!(
            "keyvault.list_versions",
            vault.name = %self.identity,
            secret.name = name
        );
        let start = Instant::now();

        let result: Result<_, StoreError> = async {
            let (chunk, next) = self
                .listing_page(next, name, || {
                    Ok(self
                        .client
                        .list_secret_properties_versions(name, None)?
                        .boxed())
                })
                .await?;
            let items = chunk
                .into_iter()
                .filter_map(|properties| {
                    let id = properties.id?;
                    let created = properties
                        .attributes
                        .and_then(|attributes| attributes.created)
                        .map(|created| created.unix_timestamp());
                    Some(
                        secret_version_from_id(&id).map(|version| VersionRef { version, created }),
                    )
                })
                .collect();
            Ok(Page { items, next })
        }
        .instrument(span)
        .await;

        record_outcome(&result, "list_versions", start);
        result
    }

    async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretRecord, StoreError> {
        let span = info_span!(
            "keyvault.get_secret",
            vault.name = %self.identity,
            secret.name = name,
            secret.version = version.unwrap_or("latest")
        );
        let start = Instant::now();

        let result: Result<_, StoreError> = async {
            let options = version.map(|version| SecretClientGetSecretOptions {
                secret_version: Some(version.to_string()),
                ..Default::default()
            });
            let response = self
                .client
                .get_secret(name, options)
                .await
                .map_err(|e| classify(e, name))?;
            let secret = serde_json::from_slice::<Secret>(&response.into_body())?;

            let resolved_version = match secret.id.as_deref().map(secret_version_from_id) {
                Some(Ok(version)) => Some(version),
                Some(Err(e)) => {
                    warn!(secret.name = name, error = %e, "Secret id has no version");
                    version.map(str::to_string)
                }
                None => version.map(str::to_string),
            };

            let mut record = SecretRecord::new(name, secret.value.unwrap_or_default());
            record.version = resolved_version;
            record.content_type = secret.content_type;
            record.enabled = secret.attributes.and_then(|attributes| attributes.enabled);
            record.tags = secret.tags.unwrap_or_default().into_iter().collect();
            Ok(record)
        }
        .instrument(span)
        .await;

        record_outcome(&result, "get_secret", start);
        result
    }

    async fn set_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let span = info_span!(
            "keyvault.set_secret",
            vault.name = %self.identity,
            secret.name = %record.name
        );
        let start = Instant::now();

        let result: Result<_, StoreError> = async {
            let parameters = SetSecretParameters {
                value: Some(record.value.to_string()),
                content_type: record.content_type.clone(),
                secret_attributes: record.enabled.map(|enabled| SecretAttributes {
                    enabled: Some(enabled),
                    ..Default::default()
                }),
                tags: (!record.tags.is_empty()).then(|| {
                    record
                        .tags
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                }),
                ..Default::default()
            };

            self.client
                .set_secret(&record.name, parameters.try_into()?, None)
                .await
                .map_err(|e| classify(e, &record.name))?;
            debug!(secret.name = %record.name, "Wrote secret");
            Ok(())
        }
        .instrument(span)
        .await;

        record_outcome(&result, "set_secret", start);
        result
    }
}
