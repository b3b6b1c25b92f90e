//! Application state shared by the CLI commands.

use std::sync::Arc;

use recall_core::agent::injector::RetrievalSettings;
use recall_core::memory::adapter::MemoryAdapter;
use recall_infra::memory::open_memory_adapter;
use recall_types::config::MemoryConfig;

/// Effective configuration plus the opened memory store.
#[derive(Clone)]
pub struct AppState {
    pub config: MemoryConfig,
    pub adapter: Arc<MemoryAdapter>,
}

impl AppState {
    /// Open the memory store for `config`. Fails fast on any init error.
    pub async fn init(config: MemoryConfig) -> anyhow::Result<Self> {
        let adapter = open_memory_adapter(&config).await?;
        Ok(Self { config, adapter })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            top_k: self.config.memory_top_k,
            threshold: self.config.memory_threshold,
        }
    }
}
