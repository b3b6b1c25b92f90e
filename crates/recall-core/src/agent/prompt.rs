//! Session-local system prompt with scoped augmentation.
//!
//! `SystemPrompt::augment` appends a block to the prompt and returns a
//! [`SystemPromptGuard`]. Dropping the guard removes that block again,
//! whether generation finished, failed, or was abandoned midway. Guards
//! from overlapping generations may drop in any order.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// Separator between the base prompt and an appended block.
pub const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Default)]
struct PromptState {
    base: String,
    /// Blocks appended by live guards, in augmentation order.
    blocks: Vec<(u64, String)>,
    next_id: u64,
}

impl PromptState {
    fn render(&self) -> String {
        let mut prompt = self.base.clone();
        for (_, block) in &self.blocks {
            prompt.push_str(BLOCK_SEPARATOR);
            prompt.push_str(block);
        }
        prompt
    }
}

/// A system prompt owned by one session.
///
/// Cloning shares the same prompt; guards hold a clone so they can restore
/// it from inside a `'static` output stream.
#[derive(Debug, Clone, Default)]
pub struct SystemPrompt {
    inner: Arc<Mutex<PromptState>>,
}

impl SystemPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PromptState {
                base: prompt.into(),
                ..PromptState::default()
            })),
        }
    }

    /// Current prompt text, including blocks of live guards.
    pub fn get(&self) -> String {
        self.lock().render()
    }

    /// The prompt without any augmentation.
    pub fn base(&self) -> String {
        self.lock().base.clone()
    }

    /// Replace the base prompt. Blocks of live guards stay appended.
    pub fn set(&self, prompt: impl Into<String>) {
        self.lock().base = prompt.into();
    }

    /// Append `block` after a blank line until the returned guard drops.
    pub fn augment(&self, block: &str) -> SystemPromptGuard {
        let mut state = self.lock();
        let original = state.base.clone();
        let augmented = format!("{original}{BLOCK_SEPARATOR}{block}");
        let id = state.next_id;
        state.next_id += 1;
        state.blocks.push((id, block.to_string()));
        drop(state);

        debug!(added_chars = block.chars().count(), "System prompt augmented");
        SystemPromptGuard {
            prompt: self.clone(),
            id,
            original,
            augmented,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PromptState> {
        // A panic while holding the lock cannot leave a half-written state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes its block from the system prompt on drop.
///
/// Dereferences to the base prompt followed by this guard's block only;
/// blocks of other live guards are not included.
#[derive(Debug)]
pub struct SystemPromptGuard {
    prompt: SystemPrompt,
    id: u64,
    original: String,
    augmented: String,
}

impl SystemPromptGuard {
    /// The base prompt at augmentation time.
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl Deref for SystemPromptGuard {
    type Target = str;

    fn deref(&self) -> &str {
        &self.augmented
    }
}

impl Drop for SystemPromptGuard {
    fn drop(&mut self) {
        self.prompt.lock().blocks.retain(|(id, _)| *id != self.id);
        debug!("System prompt restored");
    }
}
