//! Infrastructure implementations for Recall.
//!
//! This crate provides concrete implementations of the ports defined in
//! `recall-core`: the SQLite similarity store, the Ollama embedding and
//! chat clients, and configuration loading.

pub mod config;
pub mod memory;
pub mod ollama;
pub mod sqlite;
