//! Embedder trait for text-to-vector conversion.
//!
//! Store backends that rank by vector similarity use this to embed both
//! stored content and queries. Implementations (e.g., Ollama) live in
//! recall-infra.

use recall_types::error::StoreError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors, one vector per input.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, StoreError>> + Send;

    /// The model name used for embeddings (e.g., "nomic-embed-text").
    fn model_name(&self) -> &str;
}
