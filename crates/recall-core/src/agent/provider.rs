//! ConversationAgent trait definition.
//!
//! The memory layer never generates text itself. It wraps an agent that
//! takes a system prompt plus the current input and returns a lazy stream
//! of output chunks. The stream is boxed so sessions can forward it without
//! knowing its concrete type.

use std::pin::Pin;

use futures_util::Stream;

use recall_types::agent::BatchInput;

/// A base conversational agent (the generation delegate).
///
/// Implementations live in recall-infra (e.g., `OllamaChatAgent`) or in
/// tests. `Output` is whatever the agent streams, typically
/// `Result<String, AgentError>`; the memory layer forwards it untouched.
pub trait ConversationAgent: Send + Sync {
    type Output: Send + 'static;

    /// Human-readable agent name for logs.
    fn name(&self) -> &str;

    /// Start generating a reply.
    ///
    /// `system_prompt` is read once, when the call is made; the returned
    /// stream must not depend on it changing afterwards.
    fn chat(
        &self,
        system_prompt: &str,
        input: &BatchInput,
    ) -> Pin<Box<dyn Stream<Item = Self::Output> + Send + 'static>>;
}
