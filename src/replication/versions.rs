//! Version selection and ordering.

use crate::error::StoreError;
use crate::store::{SecretStore, VersionRef};
use std::fmt;
use std::str::FromStr;

/// Which versions of a secret a unit replicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionMode {
    /// Only the current version, fetched without a version token
    #[default]
    Latest,
    /// Every version in the source's version history
    AllVersions,
}

impl VersionMode {
    pub fn from_latest_only(latest_only: bool) -> Self {
        if latest_only {
            Self::Latest
        } else {
            Self::AllVersions
        }
    }
}

/// Order in which [`VersionMode::AllVersions`] processes a secret's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionOrder {
    /// Store listing order, paged lazily
    #[default]
    Listing,
    /// Buffer the listing and process by creation time, oldest first
    ///
    /// The target's current version ends up as the source's newest one.
    OldestFirst,
}

impl fmt::Display for VersionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => f.write_str("listing"),
            Self::OldestFirst => f.write_str("oldest-first"),
        }
    }
}

impl FromStr for VersionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listing" => Ok(Self::Listing),
            "oldest-first" | "oldest_first" => Ok(Self::OldestFirst),
            other => Err(format!(
                "unknown version order '{other}' (expected 'listing' or 'oldest-first')"
            )),
        }
    }
}

/// Sort by creation time; ties keep listing order, unknown times go last
pub fn oldest_first(mut versions: Vec<VersionRef>) -> Vec<VersionRef> {
    versions.sort_by_key(|v| (v.created.is_none(), v.created));
    versions
}

/// Single pass over a secret's version listing
///
/// Once the last page has been returned, or a page failed to load, the
/// cursor yields nothing more.
#[derive(Debug)]
pub struct VersionCursor {
    name: String,
    next: Option<String>,
    exhausted: bool,
}

impl VersionCursor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next: None,
            exhausted: false,
        }
    }

    /// Items of the next page, or `None` once the listing is consumed
    pub async fn next_page(
        &mut self,
        store: &dyn SecretStore,
    ) -> Result<Option<Vec<Result<VersionRef, StoreError>>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }
        match store.list_secret_versions(&self.name, self.next.take()).await {
            Ok(page) => {
                self.exhausted = page.next.is_none();
                self.next = page.next;
                Ok(Some(page.items))
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::SecretRecord;

    fn version(token: &str, created: Option<i64>) -> VersionRef {
        VersionRef {
            version: token.to_string(),
            created,
        }
    }

    #[test]
    fn test_oldest_first_orders_by_created() {
        let ordered = oldest_first(vec![
            version("c", Some(30)),
            version("unknown", None),
            version("a", Some(10)),
            version("b1", Some(20)),
            version("b2", Some(20)),
        ]);
        let tokens: Vec<_> = ordered.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(tokens, vec!["a", "b1", "b2", "c", "unknown"]);
    }

    #[test]
    fn test_version_order_parsing() {
        assert_eq!("listing".parse::<VersionOrder>().unwrap(), VersionOrder::Listing);
        assert_eq!(
            " Oldest-First ".parse::<VersionOrder>().unwrap(),
            VersionOrder::OldestFirst
        );
        assert!("newest".parse::<VersionOrder>().is_err());
        assert_eq!(VersionOrder::OldestFirst.to_string(), "oldest-first");
    }

    #[test]
    fn test_mode_from_latest_only() {
        assert_eq!(VersionMode::from_latest_only(true), VersionMode::Latest);
        assert_eq!(VersionMode::from_latest_only(false), VersionMode::AllVersions);
    }

    #[tokio::test]
    async fn test_cursor_pages_to_exhaustion() {
        let store = MemoryStore::new("src").with_page_size(2);
        for value in ["1", "2", "3"] {
            store.put(SecretRecord::new("x", value));
        }

        let mut cursor = VersionCursor::new("x");
        let mut seen = 0;
        let mut pages = 0;
        while let Some(items) = cursor.next_page(&store).await.unwrap() {
            pages += 1;
            seen += items.len();
        }
        assert_eq!((pages, seen), (2, 3));
        assert!(cursor.next_page(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_stops_after_error() {
        let store = MemoryStore::new("src");
        store.insert("x", "1");
        store.fail_version_listing("x");

        let mut cursor = VersionCursor::new("x");
        assert!(cursor.next_page(&store).await.is_err());
        assert!(cursor.next_page(&store).await.unwrap().is_none());
    }
}
