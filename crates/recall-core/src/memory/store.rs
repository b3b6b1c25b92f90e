//! Similarity store trait.
//!
//! Defines the opaque storage/search boundary for long-term memories.
//! Implementations (e.g., the SQLite cosine store) live in recall-infra.

use recall_types::error::StoreError;
use recall_types::memory::{RecordMetadata, SearchResponse};

/// Trait for a similarity-searchable memory store.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// The store is responsible for its own consistency under concurrent
/// access; callers do not serialize `add` and `search`.
pub trait SimilarityStore: Send + Sync {
    /// Persist one memory for `user_id`.
    fn add(
        &self,
        content: &str,
        user_id: &str,
        metadata: &RecordMetadata,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Find up to `limit` memories of `user_id` similar to `query`.
    ///
    /// Results are ranked by the store, typically by descending score.
    fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<SearchResponse, StoreError>> + Send;

    /// Count stored memories for `user_id`.
    fn count(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}
