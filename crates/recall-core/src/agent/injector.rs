//! Retrieval injection around a single generation.
//!
//! `RetrievalInjector::augment_and_delegate` recalls memories relevant to
//! the current user text, appends them to the session's system prompt,
//! hands the augmented prompt to the base agent, and forwards the agent's
//! output stream untouched. The prompt is restored when that stream ends or
//! is dropped.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tracing::{debug, info_span};

use super::prompt::SystemPrompt;
use crate::memory::adapter::MemoryAdapter;
use crate::memory::format::MemoryContextFormatter;

/// Where a session is in its retrieve-augment-generate cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectorPhase {
    #[default]
    Idle,
    Retrieving,
    /// A memory block was appended to the system prompt.
    Augmented,
    /// Nothing relevant was recalled; the prompt is unchanged.
    Unaugmented,
    Generating,
}

impl fmt::Display for InjectorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InjectorPhase::Idle => "idle",
            InjectorPhase::Retrieving => "retrieving",
            InjectorPhase::Augmented => "augmented",
            InjectorPhase::Unaugmented => "unaugmented",
            InjectorPhase::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// Shared view of a session's [`InjectorPhase`].
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    inner: Arc<Mutex<InjectorPhase>>,
}

impl PhaseTracker {
    pub fn get(&self) -> InjectorPhase {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set(&self, phase: InjectorPhase) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    /// Returns to `Idle` when dropped.
    fn reset_on_drop(&self) -> PhaseReset {
        PhaseReset {
            tracker: self.clone(),
        }
    }
}

struct PhaseReset {
    tracker: PhaseTracker,
}

impl Drop for PhaseReset {
    fn drop(&mut self) {
        self.tracker.set(InjectorPhase::Idle);
    }
}

/// How many memories to recall and how similar they must be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Memories must score strictly above this to be injected.
    pub threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.6,
        }
    }
}

/// Recalls memories and injects them into the system prompt.
#[derive(Clone)]
pub struct RetrievalInjector {
    adapter: Arc<MemoryAdapter>,
    formatter: MemoryContextFormatter,
    settings: RetrievalSettings,
}

impl RetrievalInjector {
    pub fn new(adapter: Arc<MemoryAdapter>, settings: RetrievalSettings) -> Self {
        Self {
            adapter,
            formatter: MemoryContextFormatter::default(),
            settings,
        }
    }

    pub fn with_formatter(mut self, formatter: MemoryContextFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn settings(&self) -> RetrievalSettings {
        self.settings
    }

    /// Formatted block of memories relevant to `query`, or "" if none pass.
    pub async fn memory_block(&self, query: &str, user_id: &str) -> String {
        let memories = self
            .adapter
            .retrieve_relevant(query, user_id, self.settings.top_k, self.settings.threshold)
            .await;
        self.formatter.format(&memories)
    }

    /// Augment `prompt` with recalled memories, then delegate generation.
    ///
    /// `base_generate` receives the effective system prompt and starts the
    /// base agent's stream, whose items are forwarded as-is. Retrieval is
    /// skipped when `current_user_text` is empty. The prompt is restored
    /// when the returned stream completes, yields the delegate's error, or
    /// is dropped early.
    pub fn augment_and_delegate<T, F>(
        &self,
        prompt: SystemPrompt,
        phase: PhaseTracker,
        user_id: String,
        current_user_text: String,
        base_generate: F,
    ) -> Pin<Box<dyn Stream<Item = T> + Send + 'static>>
    where
        T: Send + 'static,
        F: FnOnce(String) -> Pin<Box<dyn Stream<Item = T> + Send + 'static>> + Send + 'static,
    {
        let injector = self.clone();
        let span = info_span!(
            "memory.augment_and_delegate",
            user_id = %user_id,
            memory.top_k = self.settings.top_k,
            memory.threshold = self.settings.threshold,
        );

        let stream = async_stream::stream! {
            let _reset = phase.reset_on_drop();

            let guard = if current_user_text.is_empty() {
                debug!("Empty user text, skipping memory retrieval");
                None
            } else {
                phase.set(InjectorPhase::Retrieving);
                let block = injector.memory_block(&current_user_text, &user_id).await;
                if block.is_empty() {
                    None
                } else {
                    Some(prompt.augment(&block))
                }
            };

            phase.set(if guard.is_some() {
                InjectorPhase::Augmented
            } else {
                InjectorPhase::Unaugmented
            });

            let effective_prompt = match &guard {
                Some(guard) => String::from(&**guard),
                None => prompt.base(),
            };

            phase.set(InjectorPhase::Generating);
            let mut inner = base_generate(effective_prompt);
            while let Some(item) = inner.next().await {
                yield item;
            }

            drop(inner);
            drop(guard);
        };

        Box::pin(StreamInSpan {
            inner: stream,
            span,
        })
    }
}

pin_project! {
    /// Enters `span` on every poll so the whole stream runs inside it.
    struct StreamInSpan<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S: Stream> Stream for StreamInSpan<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    use crate::memory::adapter::tests::{FailingStore, RecordingStore};
    use crate::memory::box_store::BoxSimilarityStore;

    const BASE_PROMPT: &str = "You are Kristina.";

    type Captured = Arc<Mutex<Vec<String>>>;

    fn injector(store: RecordingStore, threshold: f32) -> RetrievalInjector {
        let adapter = Arc::new(MemoryAdapter::new(BoxSimilarityStore::new(store)));
        RetrievalInjector::new(
            adapter,
            RetrievalSettings {
                top_k: 3,
                threshold,
            },
        )
    }

    /// Delegate that records the prompt it saw and streams `chunks`.
    fn delegate(
        seen: Captured,
        chunks: Vec<&'static str>,
    ) -> impl FnOnce(String) -> Pin<Box<dyn Stream<Item = &'static str> + Send>> + Send + 'static
    {
        move |prompt| {
            seen.lock().unwrap().push(prompt);
            Box::pin(stream::iter(chunks))
        }
    }

    #[tokio::test]
    async fn test_memories_above_threshold_are_injected() {
        let store = RecordingStore::with_hits(vec![("用户说：我叫小明\n你回答：你好小明！", 0.75)]);
        let prompt = SystemPrompt::new(BASE_PROMPT);
        let phase = PhaseTracker::default();
        let seen = Captured::default();

        let out: Vec<_> = injector(store, 0.6)
            .augment_and_delegate(
                prompt.clone(),
                phase.clone(),
                "u1".to_string(),
                "我的名字是什么".to_string(),
                delegate(seen.clone(), vec!["你叫", "小明"]),
            )
            .collect()
            .await;

        assert_eq!(out, vec!["你叫", "小明"]);
        assert_eq!(
            seen.lock().unwrap()[0],
            "You are Kristina.\n\n【回忆】\n- 我记得：用户说：我叫小明 你回答：你好小明！...\n"
        );
        assert_eq!(prompt.get(), BASE_PROMPT);
        assert_eq!(phase.get(), InjectorPhase::Idle);
    }

    #[tokio::test]
    async fn test_higher_threshold_leaves_prompt_unchanged() {
        let store = RecordingStore::with_hits(vec![("用户说：我叫小明\n你回答：你好小明！", 0.75)]);
        let prompt = SystemPrompt::new(BASE_PROMPT);
        let seen = Captured::default();

        let _: Vec<_> = injector(store, 0.8)
            .augment_and_delegate(
                prompt.clone(),
                PhaseTracker::default(),
                "u1".to_string(),
                "我的名字是什么".to_string(),
                delegate(seen.clone(), vec!["?"]),
            )
            .collect()
            .await;

        assert_eq!(seen.lock().unwrap()[0], BASE_PROMPT);
    }

    #[tokio::test]
    async fn test_empty_user_text_skips_retrieval() {
        let store = RecordingStore::with_hits(vec![("anything", 0.99)]);
        let searches = store.searches.clone();
        let seen = Captured::default();

        let _: Vec<_> = injector(store, 0.6)
            .augment_and_delegate(
                SystemPrompt::new(BASE_PROMPT),
                PhaseTracker::default(),
                "u1".to_string(),
                String::new(),
                delegate(seen.clone(), vec!["hi"]),
            )
            .collect()
            .await;

        assert!(searches.lock().unwrap().is_empty());
        assert_eq!(seen.lock().unwrap()[0], BASE_PROMPT);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_plain_generation() {
        let adapter = Arc::new(MemoryAdapter::new(BoxSimilarityStore::new(FailingStore)));
        let injector = RetrievalInjector::new(adapter, RetrievalSettings::default());
        let seen = Captured::default();

        let out: Vec<_> = injector
            .augment_and_delegate(
                SystemPrompt::new(BASE_PROMPT),
                PhaseTracker::default(),
                "u1".to_string(),
                "hello".to_string(),
                delegate(seen.clone(), vec!["a", "b", "c"]),
            )
            .collect()
            .await;

        assert_eq!(out, vec!["a", "b", "c"]);
        assert_eq!(seen.lock().unwrap()[0], BASE_PROMPT);
    }

    #[tokio::test]
    async fn test_prompt_restored_when_stream_dropped_early() {
        let store = RecordingStore::with_hits(vec![("memory", 0.9)]);
        let prompt = SystemPrompt::new(BASE_PROMPT);
        let phase = PhaseTracker::default();

        let mut out = injector(store, 0.6).augment_and_delegate(
            prompt.clone(),
            phase.clone(),
            "u1".to_string(),
            "query".to_string(),
            delegate(Captured::default(), vec!["one", "two", "three"]),
        );

        assert_eq!(out.next().await, Some("one"));
        assert_ne!(prompt.get(), BASE_PROMPT);
        assert_eq!(phase.get(), InjectorPhase::Generating);

        drop(out);
        assert_eq!(prompt.get(), BASE_PROMPT);
        assert_eq!(phase.get(), InjectorPhase::Idle);
    }

    #[tokio::test]
    async fn test_prompt_restored_after_delegate_error() {
        let store = RecordingStore::with_hits(vec![("memory", 0.9)]);
        let prompt = SystemPrompt::new(BASE_PROMPT);

        let out: Vec<Result<&str, &str>> = injector(store, 0.6)
            .augment_and_delegate(
                prompt.clone(),
                PhaseTracker::default(),
                "u1".to_string(),
                "query".to_string(),
                |_prompt| -> Pin<Box<dyn Stream<Item = Result<&'static str, &'static str>> + Send>> {
                    Box::pin(stream::iter(vec![Ok("partial"), Err("model crashed")]))
                },
            )
            .collect()
            .await;

        assert_eq!(out, vec![Ok("partial"), Err("model crashed")]);
        assert_eq!(prompt.get(), BASE_PROMPT);
    }

    #[tokio::test]
    async fn test_unpolled_stream_does_not_touch_prompt() {
        let store = RecordingStore::with_hits(vec![("memory", 0.9)]);
        let prompt = SystemPrompt::new(BASE_PROMPT);

        let out = injector(store, 0.6).augment_and_delegate(
            prompt.clone(),
            PhaseTracker::default(),
            "u1".to_string(),
            "query".to_string(),
            delegate(Captured::default(), vec!["x"]),
        );
        drop(out);

        assert_eq!(prompt.get(), BASE_PROMPT);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(InjectorPhase::Unaugmented.to_string(), "unaugmented");
        assert_eq!(InjectorPhase::default(), InjectorPhase::Idle);
    }
}
