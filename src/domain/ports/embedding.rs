use crate::domain::{EmbeddingVector, Result};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>>;
    fn dimension(&self) -> usize;
}
