//! SQLite-backed similarity store.
//!
//! Implements `SimilarityStore` from `recall-core`. Each memory row keeps
//! its content, metadata JSON, and embedding (a JSON array of f32). Search
//! embeds the query and ranks the user's rows by cosine similarity, which
//! is brute force but fine for one user's conversation history.

use std::cmp::Ordering;
use std::path::Path;

use chrono::Utc;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use recall_core::memory::embedder::Embedder;
use recall_core::memory::store::SimilarityStore;
use recall_types::error::StoreError;
use recall_types::memory::{RecordMetadata, SearchHit, SearchResponse};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SimilarityStore`.
pub struct SqliteSimilarityStore<E: Embedder> {
    pool: DatabasePool,
    embedder: E,
}

impl<E: Embedder> SqliteSimilarityStore<E> {
    pub fn new(pool: DatabasePool, embedder: E) -> Self {
        Self { pool, embedder }
    }

    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path, embedder: E) -> Result<Self, StoreError> {
        let pool = DatabasePool::open(path)
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;
        Ok(Self::new(pool, embedder))
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Embedding("embedder returned no vector".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MemoryRow {
    content: String,
    embedding: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            content: row.try_get("content")?,
            embedding: row.try_get("embedding")?,
        })
    }

    fn into_hit(self, query: &[f32]) -> Result<SearchHit, StoreError> {
        let embedding: Vec<f32> = serde_json::from_str(&self.embedding)
            .map_err(|e| StoreError::Query(format!("invalid stored embedding: {e}")))?;
        Ok(SearchHit {
            score: cosine_similarity(query, &embedding),
            memory: self.content,
        })
    }
}

fn query_err(e: sqlx::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

/// Cosine similarity clamped to [0, 1].
///
/// Mismatched dimensions or a zero vector score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

impl<E: Embedder> SimilarityStore for SqliteSimilarityStore<E> {
    async fn add(
        &self,
        content: &str,
        user_id: &str,
        metadata: &RecordMetadata,
    ) -> Result<(), StoreError> {
        let embedding = self.embed_one(content).await?;
        let embedding_json = serde_json::to_string(&embedding)
            .map_err(|e| StoreError::Query(format!("serialize embedding: {e}")))?;
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| StoreError::Query(format!("serialize metadata: {e}")))?;

        sqlx::query(
            "INSERT INTO memories (id, user_id, content, metadata, embedding, embedding_model, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id)
        .bind(content)
        .bind(&metadata_json)
        .bind(&embedding_json)
        .bind(self.embedder.model_name())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        debug!(user_id, dimensions = embedding.len(), "Inserted memory row");
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<SearchResponse, StoreError> {
        if limit == 0 {
            return Ok(SearchResponse::default());
        }

        let query_embedding = self.embed_one(query).await?;

        // Vectors from another embedding model are not comparable.
        let rows = sqlx::query(
            "SELECT content, embedding FROM memories WHERE user_id = ? AND embedding_model = ?",
        )
        .bind(user_id)
        .bind(self.embedder.model_name())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut hits = rows
            .iter()
            .map(|row| {
                MemoryRow::from_row(row)
                    .map_err(query_err)
                    .and_then(|r| r.into_hit(&query_embedding))
            })
            .collect::<Result<Vec<_>, _>>()?;

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);

        debug!(user_id, scanned = rows.len(), returned = hits.len(), "Similarity search");
        Ok(SearchResponse { results: hits })
    }

    async fn count(&self, user_id: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM memories WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        let n: i64 = row.try_get("n").map_err(query_err)?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_types::tag::Tag;

    /// Embeds text as keyword counts over a tiny fixed vocabulary.
    struct KeywordEmbedder;

    const VOCAB: [&str; 3] = ["cat", "dog", "bird"];

    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
            Ok(texts
                .iter()
                .map(|t| VOCAB.iter().map(|w| t.matches(w).count() as f32).collect())
                .collect())
        }

        fn model_name(&self) -> &str {
            "keyword-test"
        }
    }

    /// Same vectors as `KeywordEmbedder`, under another model name.
    struct RenamedEmbedder;

    impl Embedder for RenamedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
            KeywordEmbedder.embed(texts).await
        }

        fn model_name(&self) -> &str {
            "keyword-test-v2"
        }
    }

    /// Embedder that always fails.
    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
            Err(StoreError::Embedding("ollama not running".to_string()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn metadata() -> RecordMetadata {
        RecordMetadata {
            record_type: "conversation".to_string(),
            tags: [Tag::Preference].into_iter().collect(),
            timestamp: "2026-03-01T12:00:00.000000Z".to_string(),
        }
    }

    async fn temp_store() -> (tempfile::TempDir, SqliteSimilarityStore<KeywordEmbedder>) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSimilarityStore::open(&dir.path().join("u1_memory.db"), KeywordEmbedder)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let (_dir, store) = temp_store().await;
        store.add("I love my dog", "u1", &metadata()).await.unwrap();
        store.add("my cat sleeps all day", "u1", &metadata()).await.unwrap();
        store.add("cat and dog and bird", "u1", &metadata()).await.unwrap();

        let response = store.search("tell me about the cat", "u1", 5).await.unwrap();
        let contents: Vec<&str> = response.results.iter().map(|h| h.memory.as_str()).collect();
        assert_eq!(contents[0], "my cat sleeps all day");
        assert_eq!(contents[1], "cat and dog and bird");
        assert!((response.results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(response.results[2].score, 0.0);
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_user() {
        let (_dir, store) = temp_store().await;
        store.add("cat one", "u1", &metadata()).await.unwrap();
        store.add("cat two", "u1", &metadata()).await.unwrap();
        store.add("cat three", "u2", &metadata()).await.unwrap();

        let response = store.search("cat", "u1", 1).await.unwrap();
        assert_eq!(response.results.len(), 1);

        let response = store.search("cat", "u2", 10).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].memory, "cat three");

        assert!(store.search("cat", "nobody", 10).await.unwrap().is_empty());
        assert!(store.search("cat", "u1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_rows_from_other_embedding_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u1_memory.db");

        let old = SqliteSimilarityStore::open(&path, KeywordEmbedder).await.unwrap();
        old.add("my cat sleeps", "u1", &metadata()).await.unwrap();

        let new = SqliteSimilarityStore::open(&path, RenamedEmbedder).await.unwrap();
        new.add("a cat again", "u1", &metadata()).await.unwrap();

        let response = new.search("cat", "u1", 10).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].memory, "a cat again");

        let response = old.search("cat", "u1", 10).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].memory, "my cat sleeps");

        // Stats still count every stored memory.
        assert_eq!(new.count("u1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_open_path_with_question_mark() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSimilarityStore::open(&dir.path().join("who?_memory.db"), KeywordEmbedder)
            .await
            .unwrap();
        store.add("cat", "who?", &metadata()).await.unwrap();
        assert_eq!(store.count("who?").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_and_metadata_persisted() {
        let (_dir, store) = temp_store().await;
        store.add("a cat", "u1", &metadata()).await.unwrap();
        store.add("a cat", "u1", &metadata()).await.unwrap();

        assert_eq!(store.count("u1").await.unwrap(), 2);
        assert_eq!(store.count("u2").await.unwrap(), 0);

        let row = sqlx::query("SELECT metadata, embedding_model FROM memories LIMIT 1")
            .fetch_one(&store.pool().reader)
            .await
            .unwrap();
        let stored: RecordMetadata =
            serde_json::from_str(&row.get::<String, _>("metadata")).unwrap();
        assert_eq!(stored, metadata());
        assert_eq!(row.get::<String, _>("embedding_model"), "keyword-test");
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces_as_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSimilarityStore::open(&dir.path().join("x.db"), BrokenEmbedder)
            .await
            .unwrap();

        assert!(matches!(
            store.add("hi", "u1", &metadata()).await,
            Err(StoreError::Embedding(_))
        ));
        assert!(store.search("hi", "u1", 3).await.is_err());
        assert_eq!(store.count("u1").await.unwrap(), 0);
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        // Opposite vectors clamp to zero rather than going negative.
        assert_eq!(cosine_similarity(&[1.0], &[-1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
