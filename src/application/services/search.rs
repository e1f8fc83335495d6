use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    Result, SearchResult,
};

const CONTEXT_HEADER: &str = "Context from documents:\n";
const CONTEXT_SEPARATOR: &str = "\n---\n";
const CONTEXT_FOOTER: &str =
    "\n\nBased on the above context, please answer the following question:\n";

pub struct SearchEngine {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    default_limit: usize,
}

impl SearchEngine {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        default_limit: usize,
    ) -> Self {
        Self {
            embedding,
            store,
            default_limit,
        }
    }

    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(query, self.default_limit).await
    }

    /// Ranks every stored entry against `query`, best first, ties in
    /// insertion order. An empty store or a zero limit skips the embed call.
    #[instrument(skip(self, query), fields(chars = query.len()))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedding.embed(query).await?;
        let results = self.store.search(&vector, limit).await?;
        debug!(results = results.len(), "search complete");
        Ok(results)
    }

    /// Prompt preamble built from the best matches, or `None` when nothing
    /// matched.
    pub async fn build_context(&self, query: &str, limit: usize) -> Result<Option<String>> {
        let results = self.search(query, limit).await?;
        if results.is_empty() {
            return Ok(None);
        }

        let chunks: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        Ok(Some(format!(
            "{CONTEXT_HEADER}{}{CONTEXT_FOOTER}",
            chunks.join(CONTEXT_SEPARATOR)
        )))
    }
}
