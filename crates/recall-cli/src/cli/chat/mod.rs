//! Interactive chat with long-term memory.

pub mod commands;
pub mod input;
pub mod loop_runner;
