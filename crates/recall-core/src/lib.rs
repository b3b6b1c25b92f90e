//! Memory orchestration logic and trait definitions for Recall.
//!
//! This crate defines the "ports" (similarity store, embedder, conversation
//! agent) that the infrastructure layer implements, plus the logic that
//! ties them together: turn pairing, background persistence, retrieval with
//! threshold gating, and temporary system-prompt injection. It depends only
//! on `recall-types` -- never on `recall-infra` or any database/IO crate.

pub mod agent;
pub mod memory;
