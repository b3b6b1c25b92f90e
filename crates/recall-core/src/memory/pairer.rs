//! Turn pairing.
//!
//! `TurnPairer` observes every message of a session. It buffers the latest
//! user utterance in a single slot and, when the assistant replies, hands
//! the (user, assistant) pair to the session's persistence queue. The slot
//! is last-write-wins: an unanswered user turn is dropped as soon as a
//! newer one arrives.

use tracing::debug;

use recall_types::turn::{MessageContent, Role};

use super::format::truncate_chars;
use super::queue::{PendingWrite, PersistenceQueue};

const LOG_PREVIEW_CHARS: usize = 50;

/// What `observe` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// `skip_memory` was set.
    Skipped,
    /// No text left after normalization.
    Empty,
    /// A user utterance now occupies the pending slot.
    Buffered,
    /// A pair was handed to the persistence queue.
    Scheduled,
    /// An assistant message arrived with nothing to pair it with.
    Unpaired,
}

/// Pairs user and assistant turns of one session.
pub struct TurnPairer {
    user_id: String,
    pending_user_input: Option<String>,
    queue: PersistenceQueue,
}

impl TurnPairer {
    pub fn new(user_id: impl Into<String>, queue: PersistenceQueue) -> Self {
        Self {
            user_id: user_id.into(),
            pending_user_input: None,
            queue,
        }
    }

    /// Observe one emitted message.
    ///
    /// Never blocks on storage: a completed pair is only enqueued.
    pub fn observe(&mut self, role: Role, content: &MessageContent, skip_memory: bool) -> PairOutcome {
        if skip_memory {
            debug!(%role, "Skipping memory storage (skip_memory=true)");
            return PairOutcome::Skipped;
        }

        let text = content.normalized_text();
        if text.is_empty() {
            debug!(%role, "Empty content, skipping memory storage");
            return PairOutcome::Empty;
        }

        match role {
            Role::User => {
                if let Some(dropped) = self.pending_user_input.replace(text) {
                    debug!(
                        dropped = %truncate_chars(&dropped, LOG_PREVIEW_CHARS),
                        "Unanswered user input replaced by a newer one"
                    );
                }
                debug!("Stored user input for later pairing");
                PairOutcome::Buffered
            }
            Role::Assistant => match self.pending_user_input.take() {
                Some(user_input) => {
                    debug!(
                        response = %truncate_chars(&text, LOG_PREVIEW_CHARS),
                        "Pairing assistant response with last user input"
                    );
                    self.queue.enqueue(PendingWrite {
                        user_input,
                        response: text,
                        user_id: self.user_id.clone(),
                    });
                    PairOutcome::Scheduled
                }
                None => PairOutcome::Unpaired,
            },
        }
    }

    /// The buffered, not yet answered user utterance.
    pub fn pending(&self) -> Option<&str> {
        self.pending_user_input.as_deref()
    }

    /// Forget the buffered user utterance.
    pub fn clear_pending(&mut self) {
        self.pending_user_input = None;
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Stop accepting pairs and wait for queued writes to finish.
    pub async fn shutdown(self) {
        self.queue.drain().await;
    }
}
