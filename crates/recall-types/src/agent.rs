//! Input handed to the base conversational agent.
//!
//! `BatchInput` is what the agent receives for one generation step: the
//! user's text (first entry is the current utterance), any attached images,
//! and per-request flags.

use serde::{Deserialize, Serialize};

/// Placeholder recorded for image-only user input.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[User provided image(s)]";

/// Where a piece of input text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    #[default]
    Input,
    Clipboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    #[serde(default)]
    pub source: TextSource,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInput {
    /// A `data:image/...` URL.
    pub data: String,
}

/// Per-request flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetadata {
    /// Do not record this input in long-term memory.
    #[serde(default)]
    pub skip_memory: bool,
}

/// One generation request for the base agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInput {
    #[serde(default)]
    pub texts: Vec<TextInput>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub metadata: Option<InputMetadata>,
}

impl BatchInput {
    /// Single-text input from the user.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            texts: vec![TextInput {
                source: TextSource::Input,
                content: content.into(),
            }],
            ..Self::default()
        }
    }

    pub fn with_skip_memory(mut self, skip: bool) -> Self {
        self.metadata = Some(InputMetadata { skip_memory: skip });
        self
    }

    /// The current user utterance: the first text entry, or "".
    pub fn user_text(&self) -> &str {
        self.texts.first().map(|t| t.content.as_str()).unwrap_or("")
    }

    pub fn skip_memory(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.skip_memory)
    }

    /// Whether at least one attached image is a usable data URL.
    pub fn has_usable_images(&self) -> bool {
        self.images.iter().any(|img| img.data.starts_with("data:image"))
    }

    /// Text to record for the user turn.
    ///
    /// Falls back to a placeholder when the user only sent images, and to
    /// `None` when there is nothing to record.
    pub fn recorded_user_text(&self) -> Option<String> {
        let text = self.user_text();
        if !text.is_empty() {
            Some(text.to_string())
        } else if self.has_usable_images() {
            Some(IMAGE_ONLY_PLACEHOLDER.to_string())
        } else {
            None
        }
    }
}
