use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{
    chunk_text,
    ports::{EmbeddingService, VectorStore},
    IngestedDocument, Result, RetrievalError, TextChunk, DEFAULT_MAX_CHUNK_CHARS,
};

const DEFAULT_CONCURRENCY: usize = 4;

/// Chunk, embed and store documents.
pub struct IngestionService {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    max_chunk_chars: usize,
    concurrency: usize,
}

impl IngestionService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            store,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stores every chunk of `text` under `"{document id}#{offset}"`.
    ///
    /// All chunks are embedded before the first one is stored, so an embed
    /// failure leaves the store untouched.
    #[instrument(skip(self, text), fields(name = %name, chars = text.len()))]
    pub async fn ingest(&self, name: &str, text: &str) -> Result<IngestedDocument> {
        if self.max_chunk_chars == 0 {
            return Err(RetrievalError::validation("max_chunk_chars must be positive"));
        }

        let document = IngestedDocument::new(name);
        let chunks = chunk_text(&document.id.to_string(), text, self.max_chunk_chars);

        let vectors: Vec<_> = stream::iter(chunks.iter())
            .map(|chunk| self.embedding.embed(&chunk.content))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            self.store
                .add_embedded(&chunk.key(), &chunk.content, vector)
                .await?;
        }

        info!(document_id = %document.id, chunks = chunks.len(), "document ingested");
        Ok(document.with_chunk_count(chunks.len()))
    }

    /// Stores `text` as a single entry under `key`.
    #[instrument(skip(self, text), fields(key = %key))]
    pub async fn ingest_whole(&self, key: &str, text: &str) -> Result<()> {
        self.store.add(key, text).await
    }

    pub fn chunks_for(&self, document_id: &str, text: &str) -> Vec<TextChunk> {
        chunk_text(document_id, text, self.max_chunk_chars)
    }
}
