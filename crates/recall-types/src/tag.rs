//! Memory tags.
//!
//! Tags are categorical labels derived from the text of an interaction.
//! They annotate stored memories and are never persisted on their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Label attached to an interaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// The user sounds sad or upset.
    NeedComfort,
    /// The user talks about who they are.
    UserIdentity,
    /// Likes, dislikes and preferences.
    Preference,
    /// The user asks for help.
    Assistance,
    Happy,
}

/// Set of tags; ordered so serialized output is stable.
pub type TagSet = BTreeSet<Tag>;

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::NeedComfort,
        Tag::UserIdentity,
        Tag::Preference,
        Tag::Assistance,
        Tag::Happy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::NeedComfort => "need_comfort",
            Tag::UserIdentity => "user_identity",
            Tag::Preference => "preference",
            Tag::Assistance => "assistance",
            Tag::Happy => "happy",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("invalid tag: '{s}'"))
    }
}
