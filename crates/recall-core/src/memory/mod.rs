//! Long-term memory for conversations.
//!
//! - `tags`: keyword-based tag classification
//! - `store` / `box_store`: the similarity store port and its type-erased wrapper
//! - `embedder`: text-to-vector port used by store backends
//! - `adapter`: record building, best-effort writes, gated retrieval
//! - `queue`: fire-and-forget persistence worker
//! - `pairer`: user/assistant turn pairing
//! - `format`: rendering recalled memories into a prompt block

pub mod adapter;
pub mod box_store;
pub mod embedder;
pub mod format;
pub mod pairer;
pub mod queue;
pub mod store;
pub mod tags;
