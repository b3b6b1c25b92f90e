//! A single memory-enabled conversation.
//!
//! `MemorySession` ties together one session's system prompt, its turn
//! pairer (with its own persistence queue), and retrieval injection over a
//! shared base agent and memory adapter.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use tracing::{debug, info};

use recall_types::agent::BatchInput;
use recall_types::turn::{MessageContent, Role};

use super::injector::{InjectorPhase, PhaseTracker, RetrievalInjector, RetrievalSettings};
use super::prompt::SystemPrompt;
use super::provider::ConversationAgent;
use crate::memory::adapter::MemoryAdapter;
use crate::memory::pairer::{PairOutcome, TurnPairer};
use crate::memory::queue::PersistenceQueue;

/// One conversation with long-term memory.
pub struct MemorySession<A: ConversationAgent> {
    agent: Arc<A>,
    injector: RetrievalInjector,
    pairer: TurnPairer,
    system_prompt: SystemPrompt,
    phase: PhaseTracker,
}

impl<A: ConversationAgent + 'static> MemorySession<A> {
    /// Start a session. Must be called inside a tokio runtime, since it
    /// spawns the session's persistence worker.
    pub fn new(
        agent: Arc<A>,
        adapter: Arc<MemoryAdapter>,
        user_id: impl Into<String>,
        system_prompt: impl Into<String>,
        settings: RetrievalSettings,
    ) -> Self {
        let user_id = user_id.into();
        info!(
            user_id = %user_id,
            agent = agent.name(),
            top_k = settings.top_k,
            threshold = settings.threshold,
            "Memory session started"
        );

        let queue = PersistenceQueue::spawn(adapter.clone());
        Self {
            agent,
            injector: RetrievalInjector::new(adapter, settings),
            pairer: TurnPairer::new(user_id, queue),
            system_prompt: SystemPrompt::new(system_prompt),
            phase: PhaseTracker::default(),
        }
    }

    pub fn with_injector(mut self, injector: RetrievalInjector) -> Self {
        self.injector = injector;
        self
    }

    /// Turn-observation hook: call for every message emitted in the
    /// conversation.
    pub fn observe(
        &mut self,
        role: Role,
        content: &MessageContent,
        skip_memory: bool,
    ) -> PairOutcome {
        self.pairer.observe(role, content, skip_memory)
    }

    /// Generate a reply to `input` with relevant memories injected.
    ///
    /// The user turn is recorded for pairing before generation starts
    /// (unless `skip_memory` is set). The reply itself must be reported
    /// back through [`observe`](Self::observe) once it is complete.
    pub fn chat(&mut self, input: BatchInput) -> Pin<Box<dyn Stream<Item = A::Output> + Send + 'static>> {
        let current_user_text = input.user_text().to_string();

        if input.skip_memory() {
            debug!("skip_memory set, user turn will not be recorded");
        } else if let Some(recorded) = input.recorded_user_text() {
            self.pairer
                .observe(Role::User, &MessageContent::Text(recorded), false);
        }

        let agent = self.agent.clone();
        self.injector.augment_and_delegate(
            self.system_prompt.clone(),
            self.phase.clone(),
            self.pairer.user_id().to_string(),
            current_user_text,
            move |prompt| agent.chat(&prompt, &input),
        )
    }

    /// The prompt as it is right now (augmented while a reply streams).
    pub fn system_prompt(&self) -> String {
        self.system_prompt.get()
    }

    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        self.system_prompt.set(prompt);
    }

    pub fn phase(&self) -> InjectorPhase {
        self.phase.get()
    }

    pub fn pending_user_input(&self) -> Option<&str> {
        self.pairer.pending()
    }

    pub fn clear_pending(&mut self) {
        self.pairer.clear_pending();
    }

    pub fn user_id(&self) -> &str {
        self.pairer.user_id()
    }

    pub fn agent(&self) -> &Arc<A> {
        &self.agent
    }

    /// End the session, waiting for queued interactions to be stored.
    pub async fn shutdown(self) {
        let user_id = self.pairer.user_id().to_string();
        self.pairer.shutdown().await;
        info!(user_id = %user_id, "Memory session closed");
    }
}
