//! Memory store adapter.
//!
//! `MemoryAdapter` wraps the opaque similarity store. Writes build an
//! [`InteractionRecord`] (template content, derived tags, timestamp) and are
//! best-effort: failures are logged and swallowed. Reads are bounded by a
//! timeout and degrade to "no memories" on any failure, so the memory layer
//! can never block or break a reply.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use recall_types::error::StoreError;
use recall_types::memory::{InteractionRecord, MemoryStats, RetrievedMemory, iso_timestamp};

use super::box_store::BoxSimilarityStore;
use super::format::truncate_chars;
use super::tags::TagClassifier;

/// Characters of user text shown in log lines.
const LOG_PREVIEW_CHARS: usize = 50;

/// Default retrieval timeout when none is configured.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Adapter between the memory layer and a similarity store.
///
/// Shared across sessions (wrap it in an `Arc`); it does not serialize
/// concurrent calls.
pub struct MemoryAdapter {
    store: BoxSimilarityStore,
    retrieval_timeout: Duration,
}

impl MemoryAdapter {
    pub fn new(store: BoxSimilarityStore) -> Self {
        Self {
            store,
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn retrieval_timeout(&self) -> Duration {
        self.retrieval_timeout
    }

    /// Render a user/assistant pair into an interaction record.
    pub fn build_record(user_input: &str, response: &str, user_id: &str) -> InteractionRecord {
        InteractionRecord {
            content: format!("用户说：{user_input}\n你回答：{response}"),
            user_id: user_id.to_string(),
            tags: TagClassifier::classify_pair(user_input, response),
            timestamp: iso_timestamp(Utc::now()),
        }
    }

    /// Persist one interaction and return the record that was written.
    ///
    /// Each call creates a new record; storing the same pair twice yields two.
    pub async fn try_store(
        &self,
        user_input: &str,
        response: &str,
        user_id: &str,
    ) -> Result<InteractionRecord, StoreError> {
        let record = Self::build_record(user_input, response, user_id);
        debug!(
            content = %truncate_chars(&record.content, LOG_PREVIEW_CHARS),
            tags = ?record.tags,
            "Adding memory"
        );
        self.store
            .add(&record.content, &record.user_id, &record.metadata())
            .await?;
        Ok(record)
    }

    /// Persist one interaction. Best-effort: errors are logged, never returned.
    #[tracing::instrument(name = "store_interaction", skip_all, fields(user_id = %user_id))]
    pub async fn store(&self, user_input: &str, response: &str, user_id: &str) {
        match self.try_store(user_input, response, user_id).await {
            Ok(record) => info!(tags = ?record.tags, "Stored interaction"),
            Err(e) => error!(error = %e, "Failed to store interaction"),
        }
    }

    /// Fetch up to `limit` memories similar to `query`.
    ///
    /// Returns an empty list when the store errors, times out, or has no
    /// matches. Results keep the store's ranking.
    #[tracing::instrument(name = "retrieve_memories", skip_all, fields(user_id = %user_id, limit = limit))]
    pub async fn retrieve(&self, query: &str, user_id: &str, limit: usize) -> Vec<RetrievedMemory> {
        debug!(
            query = %truncate_chars(query, LOG_PREVIEW_CHARS),
            "Retrieving memories"
        );
        let started = Instant::now();

        let response = match tokio::time::timeout(
            self.retrieval_timeout,
            self.store.search(query, user_id, limit),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(error = %e, "Memory retrieval error");
                return Vec::new();
            }
            Err(_) => {
                let err = StoreError::Timeout(self.retrieval_timeout.as_millis() as u64);
                warn!(error = %err, "Memory retrieval timed out; continuing without memories");
                return Vec::new();
            }
        };

        if response.is_empty() {
            debug!("No relevant memories found");
            return Vec::new();
        }

        let memories: Vec<RetrievedMemory> = response
            .results
            .into_iter()
            .take(limit)
            .map(RetrievedMemory::from)
            .collect();

        info!(
            count = memories.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieved candidate memories"
        );
        memories
    }

    /// Like [`retrieve`](Self::retrieve), keeping only memories scoring
    /// strictly above `threshold`.
    pub async fn retrieve_relevant(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
        threshold: f32,
    ) -> Vec<RetrievedMemory> {
        let candidates = self.retrieve(query, user_id, limit).await;
        let total = candidates.len();
        let relevant: Vec<RetrievedMemory> = candidates
            .into_iter()
            .filter(|m| m.score > threshold)
            .collect();
        debug!(
            kept = relevant.len(),
            dropped = total - relevant.len(),
            threshold,
            "Applied similarity threshold"
        );
        relevant
    }

    /// Count stored memories for `user_id`.
    pub async fn stats(&self, user_id: &str) -> Result<MemoryStats, StoreError> {
        let total_memories = self.store.count(user_id).await?;
        Ok(MemoryStats { total_memories })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use recall_types::memory::{RecordMetadata, SearchHit, SearchResponse};
    use recall_types::tag::Tag;

    use crate::memory::store::SimilarityStore;

    /// In-memory store that records writes and answers searches from a script.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingStore {
        pub added: Arc<Mutex<Vec<(String, String, RecordMetadata)>>>,
        pub hits: Arc<Mutex<Vec<SearchHit>>>,
        pub searches: Arc<Mutex<Vec<(String, String, usize)>>>,
    }

    impl RecordingStore {
        pub(crate) fn with_hits(hits: Vec<(&str, f32)>) -> Self {
            let store = Self::default();
            *store.hits.lock().unwrap() = hits
                .into_iter()
                .map(|(memory, score)| SearchHit {
                    memory: memory.to_string(),
                    score,
                })
                .collect();
            store
        }

        pub(crate) fn added(&self) -> Vec<(String, String, RecordMetadata)> {
            self.added.lock().unwrap().clone()
        }
    }

    impl SimilarityStore for RecordingStore {
        async fn add(
            &self,
            content: &str,
            user_id: &str,
            metadata: &RecordMetadata,
        ) -> Result<(), StoreError> {
            self.added.lock().unwrap().push((
                content.to_string(),
                user_id.to_string(),
                metadata.clone(),
            ));
            Ok(())
        }

        async fn search(
            &self,
            query: &str,
            user_id: &str,
            limit: usize,
        ) -> Result<SearchResponse, StoreError> {
            self.searches
                .lock()
                .unwrap()
                .push((query.to_string(), user_id.to_string(), limit));
            Ok(SearchResponse {
                results: self.hits.lock().unwrap().clone(),
            })
        }

        async fn count(&self, user_id: &str) -> Result<u64, StoreError> {
            Ok(self
                .added
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, uid, _)| uid == user_id)
                .count() as u64)
        }
    }

    /// Store whose every operation fails.
    pub(crate) struct FailingStore;

    impl SimilarityStore for FailingStore {
        async fn add(&self, _: &str, _: &str, _: &RecordMetadata) -> Result<(), StoreError> {
            Err(StoreError::Connection("connection refused".to_string()))
        }

        async fn search(&self, _: &str, _: &str, _: usize) -> Result<SearchResponse, StoreError> {
            Err(StoreError::Connection("connection refused".to_string()))
        }

        async fn count(&self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    /// Store whose searches never finish in time.
    struct StalledStore;

    impl SimilarityStore for StalledStore {
        async fn add(&self, _: &str, _: &str, _: &RecordMetadata) -> Result<(), StoreError> {
            Ok(())
        }

        async fn search(&self, _: &str, _: &str, _: usize) -> Result<SearchResponse, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SearchResponse::default())
        }

        async fn count(&self, _: &str) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_build_record_template_and_tags() {
        let record = MemoryAdapter::build_record("我叫小明", "你好小明！", "u1");
        assert_eq!(record.content, "用户说：我叫小明\n你回答：你好小明！");
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.tags, [Tag::UserIdentity].into_iter().collect());
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_store_delegates_to_add() {
        let store = RecordingStore::default();
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store.clone()));

        adapter.store("我叫小明", "你好小明！", "u1").await;

        let added = store.added();
        assert_eq!(added.len(), 1);
        let (content, user_id, metadata) = &added[0];
        assert_eq!(content, "用户说：我叫小明\n你回答：你好小明！");
        assert_eq!(user_id, "u1");
        assert_eq!(metadata.record_type, "conversation");
        assert!(metadata.tags.contains(&Tag::UserIdentity));
    }

    #[tokio::test]
    async fn test_store_is_not_idempotent() {
        let store = RecordingStore::default();
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store.clone()));

        adapter.store("hi", "hello", "u1").await;
        adapter.store("hi", "hello", "u1").await;

        assert_eq!(store.added().len(), 2);
    }

    #[tokio::test]
    async fn test_try_store_returns_record_or_error() {
        let store = RecordingStore::default();
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store.clone()));
        let record = adapter.try_store("我喜欢猫", "猫很可爱", "u1").await.unwrap();
        assert!(record.tags.contains(&Tag::Preference));
        assert_eq!(store.added()[0].0, record.content);

        let failing = MemoryAdapter::new(BoxSimilarityStore::new(FailingStore));
        assert!(matches!(
            failing.try_store("a", "b", "u1").await,
            Err(StoreError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(FailingStore));
        // Must not panic or return an error.
        adapter.store("hi", "hello", "u1").await;
    }

    #[tokio::test]
    async fn test_retrieve_maps_hits_in_store_order() {
        let store = RecordingStore::with_hits(vec![("a", 0.9), ("b", 0.7), ("c", 0.3)]);
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store.clone()));

        let memories = adapter.retrieve("q", "u1", 3).await;
        let contents: Vec<&str> = memories.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(
            store.searches.lock().unwrap()[0],
            ("q".to_string(), "u1".to_string(), 3)
        );
    }

    #[tokio::test]
    async fn test_retrieve_truncates_to_limit() {
        let store = RecordingStore::with_hits(vec![("a", 0.9), ("b", 0.8), ("c", 0.7)]);
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store));

        assert_eq!(adapter.retrieve("q", "u1", 2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_failure_returns_empty() {
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(FailingStore));
        assert!(adapter.retrieve("q", "u1", 3).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieve_timeout_returns_empty() {
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(StalledStore))
            .with_retrieval_timeout(Duration::from_millis(100));
        assert!(adapter.retrieve("q", "u1", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_relevant_is_strictly_above_threshold() {
        let store = RecordingStore::with_hits(vec![("above", 0.61), ("equal", 0.6), ("below", 0.2)]);
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store));

        let relevant = adapter.retrieve_relevant("q", "u1", 3, 0.6).await;
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].content, "above");
    }

    #[tokio::test]
    async fn test_stats_counts_per_user() {
        let store = RecordingStore::default();
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store));

        adapter.store("a", "b", "u1").await;
        adapter.store("c", "d", "u1").await;
        adapter.store("e", "f", "u2").await;

        assert_eq!(adapter.stats("u1").await.unwrap().total_memories, 2);
        assert_eq!(adapter.stats("u3").await.unwrap().total_memories, 0);
    }

    #[tokio::test]
    async fn test_stats_surfaces_store_error() {
        let adapter = MemoryAdapter::new(BoxSimilarityStore::new(FailingStore));
        assert!(adapter.stats("u1").await.is_err());
    }
}
