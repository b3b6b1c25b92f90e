//! Configuration types for Recall.
//!
//! `MemoryConfig` represents the `config.toml` that controls store
//! isolation, retrieval limits, and the embedding backend. Every field has
//! a default, so an empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the memory layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Identifier used to isolate memories in the store.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Where the memory database lives. Created if absent.
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    /// Maximum number of candidates fetched per retrieval.
    #[serde(default = "default_top_k")]
    pub memory_top_k: usize,

    /// Candidates must score strictly above this to be injected.
    #[serde(default = "default_threshold")]
    pub memory_threshold: f32,

    /// Upper bound on a single retrieval, in milliseconds.
    #[serde(default = "default_retrieval_timeout_ms")]
    pub retrieval_timeout_ms: u64,

    /// Embedding backend settings, passed through to the store.
    #[serde(default)]
    pub embedder: EmbedderConfig,

    /// Chat model used by the CLI's `chat` command.
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_user_id() -> String {
    "kristina_default".to_string()
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("./recall_data")
}

fn default_top_k() -> usize {
    3
}

fn default_threshold() -> f32 {
    0.6
}

fn default_retrieval_timeout_ms() -> u64 {
    3_000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            data_directory: default_data_directory(),
            memory_top_k: default_top_k(),
            memory_threshold: default_threshold(),
            retrieval_timeout_ms: default_retrieval_timeout_ms(),
            embedder: EmbedderConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Reject values the memory layer cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::EmptyUserId);
        }
        if self.memory_top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if !(0.0..=1.0).contains(&self.memory_threshold) {
            return Err(ConfigError::InvalidThreshold(self.memory_threshold));
        }
        if !self.embedder.provider.eq_ignore_ascii_case("ollama") {
            return Err(ConfigError::UnsupportedProvider(
                self.embedder.provider.clone(),
            ));
        }
        Ok(())
    }

    /// Path of the SQLite database for this user.
    pub fn database_path(&self) -> PathBuf {
        self.data_directory
            .join(format!("{}_memory.db", self.user_id))
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default = "default_embed_provider")]
    pub provider: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_embed_provider() -> String {
    "ollama".to_string()
}

fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: default_embed_provider(),
            model: default_embed_model(),
            base_url: default_ollama_url(),
        }
    }
}

/// Chat model settings for the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Base system prompt; recalled memories are appended to it per turn.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_chat_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a warm, attentive companion. Reply in the user's language.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            base_url: default_ollama_url(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}
