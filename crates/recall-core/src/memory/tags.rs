//! Keyword-based tag classification.
//!
//! `TagClassifier` maps free text to a set of [`Tag`]s by case-insensitive
//! substring matching against a fixed keyword table. It is deterministic
//! and cannot fail; text that matches nothing yields an empty set.

use recall_types::tag::{Tag, TagSet};

/// Per-tag keyword lists. A tag applies when any of its keywords occurs.
const TAG_KEYWORDS: &[(Tag, &[&str])] = &[
    (Tag::NeedComfort, &["难过", "伤心", "不开心", "郁闷"]),
    (Tag::UserIdentity, &["名字", "我叫", "我是"]),
    (Tag::Preference, &["喜欢", "爱", "讨厌", "偏好"]),
    (Tag::Assistance, &["帮助", "帮忙", "求助", "问题"]),
    (Tag::Happy, &["笑", "开心", "高兴", "棒"]),
];

/// Stateless keyword classifier for interaction text.
pub struct TagClassifier;

impl TagClassifier {
    /// Classify a single piece of text.
    pub fn classify(text: &str) -> TagSet {
        let haystack = text.to_lowercase();
        TAG_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
            .map(|(tag, _)| *tag)
            .collect()
    }

    /// Classify a user/assistant pair as one combined text.
    pub fn classify_pair(user_input: &str, response: &str) -> TagSet {
        Self::classify(&format!("{user_input} {response}"))
    }
}
