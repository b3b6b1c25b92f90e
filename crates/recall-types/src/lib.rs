//! Shared domain types for Recall.
//!
//! This crate contains the types used across the memory layer: conversation
//! turns and message content, memory tags, interaction records, retrieval
//! results, the similarity-store wire shapes, configuration, and errors.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod agent;
pub mod config;
pub mod error;
pub mod memory;
pub mod tag;
pub mod turn;
