//! Rendering recalled memories into a prompt block.

use recall_types::memory::RetrievedMemory;

/// Formats retrieved memories as a bounded natural-language block.
///
/// Output layout for two memories:
/// ```text
/// 【回忆】
/// - 我记得：{first, at most max_chars characters}...
/// - 我记得：{second}...
/// ```
/// No memories means no block at all (empty string, no header).
#[derive(Debug, Clone)]
pub struct MemoryContextFormatter {
    pub header: String,
    pub line_prefix: String,
    pub line_suffix: String,
    /// Maximum characters of memory content per line.
    pub max_chars: usize,
}

impl Default for MemoryContextFormatter {
    fn default() -> Self {
        Self {
            header: "【回忆】".to_string(),
            line_prefix: "- 我记得：".to_string(),
            line_suffix: "...".to_string(),
            max_chars: 100,
        }
    }
}

impl MemoryContextFormatter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            ..Self::default()
        }
    }

    /// Render memories in the given order, one line each.
    ///
    /// Line breaks inside a memory are flattened to spaces after truncation
    /// so every memory occupies exactly one line.
    pub fn format(&self, memories: &[RetrievedMemory]) -> String {
        if memories.is_empty() {
            return String::new();
        }

        let mut block = format!("{}\n", self.header);
        for memory in memories {
            let content = truncate_chars(&memory.content, self.max_chars);
            block.push_str(&self.line_prefix);
            block.push_str(&content.replace(['\r', '\n'], " "));
            block.push_str(&self.line_suffix);
            block.push('\n');
        }
        block
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
///
/// Counts Unicode scalar values, so multi-byte text is never split.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(content: &str, score: f32) -> RetrievedMemory {
        RetrievedMemory {
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(MemoryContextFormatter::default().format(&[]), "");
    }

    #[test]
    fn test_header_plus_one_line_per_memory() {
        let formatter = MemoryContextFormatter::default();
        let block = formatter.format(&[memory("第一条", 0.9), memory("第二条", 0.7)]);

        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "【回忆】");
        assert_eq!(lines[1], "- 我记得：第一条...");
        assert_eq!(lines[2], "- 我记得：第二条...");
    }

    #[test]
    fn test_content_is_truncated_by_characters() {
        let formatter = MemoryContextFormatter::new(4);
        let block = formatter.format(&[memory("用户说：我叫小明", 0.9)]);
        assert_eq!(block, "【回忆】\n- 我记得：用户说：...\n");
    }

    #[test]
    fn test_default_bound_is_100_characters() {
        let long = "记".repeat(150);
        let block = MemoryContextFormatter::default().format(&[memory(&long, 0.9)]);
        let line = block.lines().nth(1).unwrap();
        let content = line
            .strip_prefix("- 我记得：")
            .and_then(|l| l.strip_suffix("..."))
            .unwrap();
        assert_eq!(content.chars().count(), 100);
    }

    #[test]
    fn test_multiline_memory_is_flattened_to_one_line() {
        let block =
            MemoryContextFormatter::default().format(&[memory("用户说：你好\n你回答：嗨", 0.8)]);
        assert_eq!(block, "【回忆】\n- 我记得：用户说：你好 你回答：嗨...\n");
        assert_eq!(block.lines().count(), 2);
    }

    #[test]
    fn test_truncate_chars_short_text_unchanged() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 0), "");
    }
}
