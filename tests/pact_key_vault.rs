//! Pact contract tests for the Azure Key Vault Secrets API
//!
//! These tests define the contract between secret-replicator and the Key Vault
//! REST API. Each one drives a real [`KeyVaultStore`] (and the SDK client inside
//! it) through the [`SecretStore`] trait against a Pact mock server.
//!
//! [`KeyVaultStore`]: secret_replicator::store::key_vault::KeyVaultStore

mod common;

use common::init_rustls;
use pact_consumer::patterns::StringPattern;
use pact_consumer::prelude::*;
use secret_replicator::auth::StaticTokenCredential;
use secret_replicator::prelude::*;
use serde_json::json;
use std::sync::Arc;

const CONSUMER: &str = "Secret-Replicator";
const PROVIDER: &str = "Azure-Key-Vault";

/// Connect a Key Vault store to the mock server with a fixed bearer token
async fn connect(mock_server: &dyn ValidatingMockServer) -> Arc<dyn SecretStore> {
    KeyVaultConnector::new(Arc::new(StaticTokenCredential::new("test-token")))
        .connect(mock_server.url().as_str())
        .await
        .expect("Failed to connect to mock server")
}

/// The SDK pins its own service version
fn api_version() -> StringPattern {
    term!("^7\\.[0-9]+(-preview)?$", "7.4").into()
}

fn secret_bundle(value: &str, version: &str, enabled: bool) -> serde_json::Value {
    json!({
        "value": value,
        "id": format!("https://test-vault.vault.azure.net/secrets/test-secret-name/{version}"),
        "contentType": "text/plain",
        "attributes": {
            "enabled": enabled,
            "created": 1704067200,
            "updated": 1704067200,
            "recoveryLevel": "Recoverable+Purgeable"
        },
        "tags": {
            "owner": "payments"
        }
    })
}

#[tokio::test]
async fn test_list_secrets_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list secrets in a vault", "", |mut i| {
        i.given("a vault with two secrets");
        i.request
            .method("GET")
            .path("/secrets")
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": [
                    {
                        "id": "https://test-vault.vault.azure.net/secrets/db-password",
                        "attributes": { "enabled": true, "created": 1704067200 }
                    },
                    {
                        "id": "https://test-vault.vault.azure.net/secrets/api-key",
                        "attributes": { "enabled": false, "created": 1704067300 }
                    }
                ],
                "nextLink": null
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let page = store
        .list_secret_names(None)
        .await
        .expect("Failed to list secrets");

    let names: Vec<String> = page
        .items
        .into_iter()
        .map(|item| item.expect("Listed id should parse"))
        .collect();
    assert_eq!(names, vec!["db-password", "api-key"]);
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_list_secrets_spans_store_pages() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    let listed: Vec<serde_json::Value> = (0..30)
        .map(|i| {
            json!({
                "id": format!("https://test-vault.vault.azure.net/secrets/app-{i:02}"),
                "attributes": { "enabled": true }
            })
        })
        .collect();

    pact_builder.interaction("list a vault with more secrets than one page", "", |mut i| {
        i.given("a vault with thirty secrets");
        i.request
            .method("GET")
            .path("/secrets")
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "value": listed }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let first = store
        .list_secret_names(None)
        .await
        .expect("Failed to list first page");
    assert_eq!(first.items.len(), 25);
    let token = first.next.expect("A second page should follow");

    let second = store
        .list_secret_names(Some(token.clone()))
        .await
        .expect("Failed to list second page");
    let names: Vec<String> = second
        .items
        .into_iter()
        .map(|item| item.expect("Listed id should parse"))
        .collect();
    assert_eq!(names, vec!["app-25", "app-26", "app-27", "app-28", "app-29"]);
    assert!(second.next.is_none());

    // Tokens are single use
    assert!(store.list_secret_names(Some(token)).await.is_err());
}

#[tokio::test]
async fn test_list_secret_versions_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list the versions of a secret", "", |mut i| {
        i.given("a secret exists with multiple versions");
        i.request
            .method("GET")
            .path("/secrets/test-secret-name/versions")
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": [
                    {
                        "id": "https://test-vault.vault.azure.net/secrets/test-secret-name/def456",
                        "attributes": { "enabled": true, "created": 1704067300 }
                    },
                    {
                        "id": "https://test-vault.vault.azure.net/secrets/test-secret-name/abc123",
                        "attributes": { "enabled": false, "created": 1704067200 }
                    }
                ]
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let page = store
        .list_secret_versions("test-secret-name", None)
        .await
        .expect("Failed to list versions");

    let versions: Vec<VersionRef> = page
        .items
        .into_iter()
        .map(|item| item.expect("Version id should parse"))
        .collect();
    assert_eq!(
        versions,
        vec![
            VersionRef {
                version: "def456".to_string(),
                created: Some(1704067300),
            },
            VersionRef {
                version: "abc123".to_string(),
                created: Some(1704067200),
            },
        ]
    );
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_get_latest_secret_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get the latest version of a secret", "", |mut i| {
        i.given("a secret exists in Azure Key Vault");
        i.request
            .method("GET")
            .path(term!("^/secrets/test-secret-name/?$", "/secrets/test-secret-name/"))
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(secret_bundle("test-secret-value", "abc123", true));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let record = store
        .get_secret("test-secret-name", None)
        .await
        .expect("Failed to get secret");

    assert_eq!(record.name, "test-secret-name");
    assert_eq!(record.value.as_str(), "test-secret-value");
    // The version comes from the bundle id
    assert_eq!(record.version.as_deref(), Some("abc123"));
    assert_eq!(record.content_type.as_deref(), Some("text/plain"));
    assert_eq!(record.enabled, Some(true));
    assert_eq!(record.tags.get("owner").map(String::as_str), Some("payments"));
}

#[tokio::test]
async fn test_get_secret_version_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get a specific version of a secret", "", |mut i| {
        i.given("a secret exists with multiple versions");
        i.request
            .method("GET")
            .path("/secrets/test-secret-name/abc123")
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(secret_bundle("old-value", "abc123", false));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let record = store
        .get_secret("test-secret-name", Some("abc123"))
        .await
        .expect("Failed to get secret version");

    assert_eq!(record.value.as_str(), "old-value");
    assert_eq!(record.version.as_deref(), Some("abc123"));
    assert_eq!(record.enabled, Some(false));
}

#[tokio::test]
async fn test_set_secret_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("set a secret in Azure Key Vault", "", |mut i| {
        i.given("Azure Key Vault exists and credentials are configured");
        i.request
            .method("PUT")
            .path("/secrets/test-secret-name")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .query_param("api-version", api_version())
            .json_body(json!({
                "value": "test-secret-value",
                "contentType": "text/plain",
                "attributes": { "enabled": true },
                "tags": { "owner": "payments" }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(secret_bundle("test-secret-value", "def456", true));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let record = SecretRecord::new("test-secret-name", "test-secret-value")
        .with_version("abc123")
        .with_content_type("text/plain")
        .with_enabled(true)
        .with_tag("owner", "payments");

    store
        .set_secret(&record)
        .await
        .expect("Failed to set secret");
}

#[tokio::test]
async fn test_set_secret_without_metadata_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("set a secret with only a value", "", |mut i| {
        i.given("Azure Key Vault exists and credentials are configured");
        i.request
            .method("PUT")
            .path("/secrets/test-secret-name")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .query_param("api-version", api_version())
            .json_body(json!({
                "value": "test-secret-value"
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "value": "test-secret-value",
                "id": "https://test-vault.vault.azure.net/secrets/test-secret-name/def456",
                "attributes": { "enabled": true }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    store
        .set_secret(&SecretRecord::new("test-secret-name", "test-secret-value"))
        .await
        .expect("Failed to set secret");
}

#[tokio::test]
async fn test_get_disabled_secret_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get a disabled secret version", "", |mut i| {
        i.given("a secret version is disabled");
        i.request
            .method("GET")
            .path("/secrets/test-secret-name/abc123")
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(403)
            .header("content-type", "application/json")
            .header("x-ms-error-code", "SecretDisabled")
            .json_body(json!({
                "error": {
                    "code": "Forbidden",
                    "message": "Operation get is not allowed on a disabled secret.",
                    "innererror": {
                        "code": "SecretDisabled"
                    }
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let err = store
        .get_secret("test-secret-name", Some("abc123"))
        .await
        .expect_err("Disabled secret should not be readable");

    assert!(err.is_disabled(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_get_missing_secret_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get a secret that does not exist", "", |mut i| {
        i.given("the secret does not exist");
        i.request
            .method("GET")
            .path(term!("^/secrets/missing-secret/?$", "/secrets/missing-secret/"))
            .header("authorization", "Bearer test-token")
            .query_param("api-version", api_version());
        i.response
            .status(404)
            .header("content-type", "application/json")
            .header("x-ms-error-code", "SecretNotFound")
            .json_body(json!({
                "error": {
                    "code": "SecretNotFound",
                    "message": "A secret with (name/id) missing-secret was not found in this key vault."
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let store = connect(mock_server.as_ref()).await;

    let err = store
        .get_secret("missing-secret", None)
        .await
        .expect_err("Missing secret should be an error");

    match err {
        StoreError::Http { status, code, .. } => {
            assert_eq!(status, 404);
            assert_eq!(code, "SecretNotFound");
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    }
}
