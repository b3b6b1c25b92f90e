//! Startup wiring for the memory layer.
//!
//! Turns a validated [`MemoryConfig`] into a shared [`MemoryAdapter`] backed
//! by the per-user SQLite store and the Ollama embedder. Any failure here is
//! fatal: the memory layer never runs half-initialized.

use std::sync::Arc;
use std::time::Duration;

use recall_core::memory::adapter::MemoryAdapter;
use recall_core::memory::box_store::BoxSimilarityStore;
use recall_types::config::MemoryConfig;
use recall_types::error::InitError;

use crate::config::ensure_data_dir;
use crate::ollama::embedder::OllamaEmbedder;
use crate::sqlite::store::SqliteSimilarityStore;

/// Open the memory store described by `config`.
#[tracing::instrument(skip_all, fields(user_id = %config.user_id))]
pub async fn open_memory_adapter(config: &MemoryConfig) -> Result<Arc<MemoryAdapter>, InitError> {
    config.validate()?;
    ensure_data_dir(&config.data_directory).await?;

    let embedder = OllamaEmbedder::from_config(&config.embedder)?;
    let db_path = config.database_path();
    let store = SqliteSimilarityStore::open(&db_path, embedder).await?;

    tracing::info!(
        db = %db_path.display(),
        embedder = %config.embedder.model,
        top_k = config.memory_top_k,
        threshold = config.memory_threshold,
        "Memory store opened"
    );

    let adapter = MemoryAdapter::new(BoxSimilarityStore::new(store))
        .with_retrieval_timeout(Duration::from_millis(config.retrieval_timeout_ms));
    Ok(Arc::new(adapter))
}
