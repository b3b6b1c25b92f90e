//! Memory-aware conversation flow.
//!
//! - `ConversationAgent`: the base agent that actually generates replies
//! - `SystemPrompt` / `SystemPromptGuard`: session-local prompt with scoped augmentation
//! - `RetrievalInjector`: recalls memories and injects them around one generation
//! - `MemorySession`: one conversation wired to pairing, persistence and injection

pub mod injector;
pub mod prompt;
pub mod provider;
pub mod session;
