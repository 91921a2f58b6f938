use crate::error::StoreError;
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Immutable snapshot of one secret version
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    /// Version token; `None` when the store did not report one
    pub version: Option<String>,
    pub value: Zeroizing<String>,
    pub content_type: Option<String>,
    /// `None` means the store did not report the flag
    pub enabled: Option<bool>,
    pub tags: BTreeMap<String, String>,
}

impl SecretRecord {
    /// Record with a value and no metadata
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            value: Zeroizing::new(value.into()),
            content_type: None,
            enabled: None,
            tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("value", &"<redacted>")
            .field("content_type", &self.content_type)
            .field("enabled", &self.enabled)
            .field("tags", &self.tags)
            .finish()
    }
}

/// A version token from a version listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    pub version: String,
    /// Creation time in seconds since the epoch, when the store reports it
    pub created: Option<i64>,
}

/// One page of a listing
#[derive(Debug)]
pub struct Page<T> {
    /// Items in listing order; malformed items are per-item errors
    pub items: Vec<Result<T, StoreError>>,
    /// Continuation for the next page, `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<Result<T, StoreError>>) -> Self {
        Self { items, next: None }
    }
}
