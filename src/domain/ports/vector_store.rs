use crate::domain::{EmbeddingVector, IndexedEntry, Result, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds `content` and stores it under `key`, replacing any live entry.
    async fn add(&self, key: &str, content: &str) -> Result<()>;

    /// Stores a vector the caller already computed.
    async fn add_embedded(&self, key: &str, content: &str, vector: EmbeddingVector)
        -> Result<()>;

    /// Top `limit` entries by cosine similarity, best first.
    async fn search(&self, query: &EmbeddingVector, limit: usize) -> Result<Vec<SearchResult>>;

    fn get(&self, key: &str) -> Option<IndexedEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
