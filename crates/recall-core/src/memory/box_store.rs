//! BoxSimilarityStore -- object-safe dynamic dispatch wrapper for SimilarityStore.
//!
//! 1. Define an object-safe `SimilarityStoreDyn` trait with boxed futures
//! 2. Blanket-impl `SimilarityStoreDyn` for all `T: SimilarityStore`
//! 3. `BoxSimilarityStore` wraps `Box<dyn SimilarityStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use recall_types::error::StoreError;
use recall_types::memory::{RecordMetadata, SearchResponse};

use super::store::SimilarityStore;

/// Object-safe version of [`SimilarityStore`] with boxed futures.
pub trait SimilarityStoreDyn: Send + Sync {
    fn add_boxed<'a>(
        &'a self,
        content: &'a str,
        user_id: &'a str,
        metadata: &'a RecordMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
        user_id: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, StoreError>> + Send + 'a>>;

    fn count_boxed<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + 'a>>;
}

impl<T: SimilarityStore> SimilarityStoreDyn for T {
    fn add_boxed<'a>(
        &'a self,
        content: &'a str,
        user_id: &'a str,
        metadata: &'a RecordMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.add(content, user_id, metadata))
    }

    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
        user_id: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, StoreError>> + Send + 'a>> {
        Box::pin(self.search(query, user_id, limit))
    }

    fn count_boxed<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + 'a>> {
        Box::pin(self.count(user_id))
    }
}

/// Type-erased similarity store for runtime backend selection.
///
/// Since `SimilarityStore` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxSimilarityStore` provides equivalent methods that delegate
/// to the inner `SimilarityStoreDyn` trait object.
pub struct BoxSimilarityStore {
    inner: Box<dyn SimilarityStoreDyn + Send + Sync>,
}

impl BoxSimilarityStore {
    pub fn new<T: SimilarityStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn add(
        &self,
        content: &str,
        user_id: &str,
        metadata: &RecordMetadata,
    ) -> Result<(), StoreError> {
        self.inner.add_boxed(content, user_id, metadata).await
    }

    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<SearchResponse, StoreError> {
        self.inner.search_boxed(query, user_id, limit).await
    }

    pub async fn count(&self, user_id: &str) -> Result<u64, StoreError> {
        self.inner.count_boxed(user_id).await
    }
}
