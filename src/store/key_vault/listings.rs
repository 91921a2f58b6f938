//! Listings kept open between page calls.
//!
//! The SDK pager follows `nextLink` on its own, so a [`SecretStore`] page call
//! takes a bounded run of items from the pager and parks the rest under an
//! opaque continuation token.
//!
//! [`SecretStore`]: crate::store::SecretStore

use crate::error::StoreError;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

pub(super) type ItemStream<T> = BoxStream<'static, azure_core::Result<T>>;

/// One run of items taken from a listing
pub(super) struct Chunk<T> {
    pub items: Vec<T>,
    pub exhausted: bool,
}

/// Pull up to `size` items from `stream`
pub(super) async fn take<T>(
    stream: &mut ItemStream<T>,
    size: usize,
) -> azure_core::Result<Chunk<T>> {
    let mut items = Vec::with_capacity(size);
    while items.len() < size {
        match stream.next().await {
            Some(item) => items.push(item?),
            None => {
                return Ok(Chunk {
                    items,
                    exhausted: true,
                })
            }
        }
    }
    Ok(Chunk {
        items,
        exhausted: false,
    })
}

/// Parked listings by continuation token
pub(super) struct Listings<T> {
    next_token: AtomicU64,
    open: Mutex<HashMap<String, ItemStream<T>>>,
}

impl<T> Default for Listings<T> {
    fn default() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Listings<T> {
    /// Take back the listing parked under `token`
    ///
    /// # Errors
    /// Returns `StoreError::InvalidId` for tokens this store never handed out
    /// or has already resumed
    pub async fn resume(&self, token: &str) -> Result<ItemStream<T>, StoreError> {
        self.open
            .lock()
            .await
            .remove(token)
            .ok_or_else(|| StoreError::InvalidId(format!("unknown continuation token: {token}")))
    }

    /// Park `stream` and return the token that resumes it
    pub async fn park(&self, stream: ItemStream<T>) -> String {
        let token = format!("listing-{}", self.next_token.fetch_add(1, Ordering::Relaxed));
        self.open.lock().await.insert(token.clone(), stream);
        token
    }

    #[cfg(test)]
    pub async fn parked(&self) -> usize {
        self.open.lock().await.len()
    }
}
