use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 500;

/// Bookkeeping record returned by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedDocument {
    pub id: Uuid,
    pub name: String,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestedDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            chunk_count: 0,
            ingested_at: Utc::now(),
        }
    }

    pub fn with_chunk_count(mut self, chunk_count: usize) -> Self {
        self.chunk_count = chunk_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub document_id: String,
    pub content: String,
    /// Character offset of the chunk's window in the normalized text.
    pub sequence_index: usize,
}

impl TextChunk {
    pub fn new(
        document_id: impl Into<String>,
        content: impl Into<String>,
        sequence_index: usize,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            content: content.into(),
            sequence_index,
        }
    }

    /// Store key for this chunk, unique within its document.
    pub fn key(&self) -> String {
        format!("{}#{}", self.document_id, self.sequence_index)
    }
}

/// Collapses `\r\n`, `\n\r` and lone `\r` into `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\n' => {
                chars.next_if_eq(&'\r');
                out.push('\n');
            }
            other => out.push(other),
        }
    }

    out
}

/// Splits text into word-respecting windows of at most `max_chunk_chars`
/// characters.
///
/// A window that stops short of the end of the text is cut back to its last
/// whitespace, and the cursor moves to that cut point. Windows that trim down
/// to nothing are skipped. `sequence_index` is the window's starting character
/// offset in the line-ending-normalized text.
pub fn chunk_text(document_id: &str, text: &str, max_chunk_chars: usize) -> Vec<TextChunk> {
    let normalized: Vec<char> = normalize_line_endings(text).chars().collect();
    let window = max_chunk_chars.max(1);

    let mut chunks = Vec::new();
    let mut cursor = 0;

    while cursor < normalized.len() {
        let end = (cursor + window).min(normalized.len());
        let mut segment = &normalized[cursor..end];

        if end < normalized.len() {
            if let Some(boundary) = segment.iter().rposition(|c| c.is_whitespace()) {
                segment = &segment[..boundary];
            }
        }

        let content: String = segment.iter().collect();
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk::new(document_id, trimmed, cursor));
        }

        // Always make progress, even when the cut point is the window start.
        cursor += segment.len().max(1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[TextChunk]) -> Vec<(&str, usize)> {
        chunks
            .iter()
            .map(|c| (c.content.as_str(), c.sequence_index))
            .collect()
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("doc", "", 100).is_empty());
    }

    #[test]
    fn test_chunk_text_single_chunk() {
        let chunks = chunk_text("doc", "Hello world. This is a test.", 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world. This is a test.");
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].document_id, "doc");
    }

    #[test]
    fn test_chunk_text_cuts_at_last_space() {
        let chunks = chunk_text("doc", "the quick brown fox jumps", 10);

        assert_eq!(
            contents(&chunks),
            vec![("the quick", 0), ("brown", 9), ("fox jumps", 15)]
        );
    }

    #[test]
    fn test_chunk_text_word_longer_than_window() {
        let chunks = chunk_text("doc", "abcdefghij", 4);

        assert_eq!(contents(&chunks), vec![("abcd", 0), ("efgh", 4), ("ij", 8)]);
    }

    #[test]
    fn test_chunk_text_empty_cut_still_advances() {
        let chunks = chunk_text("doc", "aaaa bbbbbbbbbb", 5);

        assert_eq!(
            contents(&chunks),
            vec![("aaaa", 0), ("bbbbb", 5), ("bbbbb", 10)]
        );
    }

    #[test]
    fn test_chunk_text_whitespace_only() {
        assert!(chunk_text("doc", "      ", 2).is_empty());
        assert!(chunk_text("doc", "\r\n\r\n\n", 1).is_empty());
    }

    #[test]
    fn test_chunk_text_normalizes_line_endings() {
        let chunks = chunk_text("doc", "a\r\nb\rc\n\rd", 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "a\nb\nc\nd");
    }

    #[test]
    fn test_chunk_text_counts_characters_not_bytes() {
        let chunks = chunk_text("doc", "héllo wörld", 6);

        assert_eq!(contents(&chunks), vec![("héllo", 0), ("wörld", 5)]);
    }

    #[test]
    fn test_chunk_text_zero_window_terminates() {
        let chunks = chunk_text("doc", "ab", 0);
        assert_eq!(contents(&chunks), vec![("a", 0), ("b", 1)]);
    }

    #[test]
    fn test_chunk_text_bounds_and_ordering() {
        let words = ["lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing"];
        let text: String = (0..400)
            .map(|i| words[(i * 7 + 3) % words.len()])
            .collect::<Vec<_>>()
            .join(" ");
        let max = 37;

        let chunks = chunk_text("doc", &text, max);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= max);
            assert!(!chunk.content.starts_with(' ') && !chunk.content.ends_with(' '));
            for word in chunk.content.split(' ') {
                assert!(words.contains(&word), "split mid-word: {word:?}");
            }
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].sequence_index < pair[1].sequence_index);
        }

        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.content.split(' ')).collect();
        let original: Vec<&str> = text.split(' ').collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_chunk_key_is_document_scoped() {
        let chunk = TextChunk::new("doc-1", "text", 42);
        assert_eq!(chunk.key(), "doc-1#42");
    }

    #[test]
    fn test_ingested_document_defaults() {
        let doc = IngestedDocument::new("notes.txt").with_chunk_count(3);
        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.chunk_count, 3);
    }
}
