use serde::{Deserialize, Serialize};

use super::EmbeddingVector;

/// Unit held by the vector store: one live entry per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub key: String,
    pub content: String,
    pub vector: EmbeddingVector,
}

impl IndexedEntry {
    pub fn new(key: impl Into<String>, content: impl Into<String>, vector: EmbeddingVector) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            vector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub key: String,
    pub similarity: f32,
    pub content: String,
}
