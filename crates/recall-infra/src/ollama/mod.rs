//! Ollama clients: text embeddings for the store, streaming chat for the CLI.

pub mod chat;
pub mod embedder;
