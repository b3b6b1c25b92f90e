//! Memory types for Recall.
//!
//! These types model long-term conversational memory: the interaction
//! record written once per completed user/assistant pair, the metadata sent
//! to the similarity store alongside it, and the ranked results coming back.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::tag::TagSet;

/// Metadata `type` value for records produced by turn pairing.
pub const CONVERSATION_RECORD_TYPE: &str = "conversation";

/// A persisted (user, assistant) pair with derived tags.
///
/// Created once per completed pair and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// The rendered pair, e.g. `用户说：...\n你回答：...`.
    pub content: String,
    pub user_id: String,
    pub tags: TagSet,
    /// ISO-8601 creation time.
    pub timestamp: String,
}

impl InteractionRecord {
    /// The metadata block handed to the similarity store with this record.
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            record_type: CONVERSATION_RECORD_TYPE.to_string(),
            tags: self.tags.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Metadata stored next to each memory in the similarity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub tags: TagSet,
    pub timestamp: String,
}

/// One hit returned by the similarity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub memory: String,
    #[serde(default)]
    pub score: f32,
}

/// Search response from the similarity store.
///
/// A missing `results` key and an empty list both mean "no matches".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A memory surfaced by retrieval, discarded after context injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMemory {
    pub content: String,
    /// Similarity in [0, 1], higher is more relevant.
    pub score: f32,
}

impl From<SearchHit> for RetrievedMemory {
    fn from(hit: SearchHit) -> Self {
        Self {
            content: hit.memory,
            score: hit.score,
        }
    }
}

/// Per-user memory statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memories: u64,
}

/// ISO-8601 timestamp used for record metadata.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
