use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    EmbeddingVector, IndexedEntry, Result, RetrievalError, SearchResult,
};
use crate::infrastructure::vector_store::in_memory::EntryIndex;
use crate::infrastructure::vector_store::log::RecordLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    pub records_before: u64,
    pub records_after: u64,
}

/// Vector store backed by an append-only record log.
///
/// Lock order is log, then index. `add` keeps the log lock across the
/// append and the index update, so the in-memory winner for a key is
/// always the record replay would pick. Searches only touch the index.
/// File writes run on the blocking pool.
pub struct PersistentVectorStore {
    embedder: Arc<dyn EmbeddingService>,
    index: Arc<EntryIndex>,
    log: Arc<Mutex<RecordLog>>,
    log_path: PathBuf,
    dimension: usize,
}

impl PersistentVectorStore {
    /// Opens the log at `path` and replays it. The store is usable only once
    /// this returns.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn initialize(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dimension = embedder.dimension();

        let (log, index, stats) = run_blocking(move || {
            let mut log = RecordLog::new(path);
            let index = EntryIndex::new();
            let stats = log.replay(dimension, |record| {
                index.upsert(IndexedEntry::new(
                    record.key,
                    record.content,
                    EmbeddingVector::new(record.vector),
                ))
            })?;
            Ok((log, index, stats))
        })
        .await?;

        info!(
            entries = index.len(),
            records = stats.records,
            discarded_bytes = stats.discarded_bytes,
            path = %log.path().display(),
            "vector store initialized"
        );

        Ok(Self {
            embedder,
            index: Arc::new(index),
            log_path: log.path().to_path_buf(),
            log: Arc::new(Mutex::new(log)),
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Live keys in first-insert order.
    pub fn keys(&self) -> Vec<String> {
        self.index.keys()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Rewrites the log with one record per live key. Never runs on its own.
    #[instrument(skip(self))]
    pub async fn compact(&self) -> Result<CompactionStats> {
        let log = Arc::clone(&self.log);
        let index = Arc::clone(&self.index);

        // The snapshot is taken under the log lock so no append slips between
        // it and the rewrite.
        let (records_before, records_after) = run_blocking(move || {
            let mut log = lock_log(&log)?;
            let records_before = log.records();
            let live = index.snapshot()?;
            let records_after = log.rewrite(live.iter().map(Arc::as_ref))?;
            Ok((records_before, records_after))
        })
        .await?;

        info!(records_before, records_after, "vector log compacted");
        Ok(CompactionStats {
            records_before,
            records_after,
        })
    }
}

fn lock_log(log: &Mutex<RecordLog>) -> Result<MutexGuard<'_, RecordLog>> {
    log.lock()
        .map_err(|e| RetrievalError::internal(format!("vector log lock poisoned: {e}")))
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RetrievalError::internal(format!("vector log task failed: {e}")))?
}

#[async_trait]
impl VectorStore for PersistentVectorStore {
    #[instrument(skip(self, content), fields(key = %key, chars = content.len()))]
    async fn add(&self, key: &str, content: &str) -> Result<()> {
        let vector = self.embedder.embed(content).await?;
        self.add_embedded(key, content, vector).await
    }

    #[instrument(skip(self, content, vector), fields(key = %key))]
    async fn add_embedded(
        &self,
        key: &str,
        content: &str,
        vector: EmbeddingVector,
    ) -> Result<()> {
        if vector.dimension() != self.dimension {
            return Err(RetrievalError::validation(format!(
                "vector has {} dimensions, store expects {}",
                vector.dimension(),
                self.dimension
            )));
        }

        let log = Arc::clone(&self.log);
        let index = Arc::clone(&self.index);
        let entry = IndexedEntry::new(key, content, vector);

        run_blocking(move || {
            let mut log = lock_log(&log)?;
            log.append(&entry.key, &entry.content, entry.vector.as_slice())?;
            index.upsert(entry)
        })
        .await
    }

    #[instrument(skip(self, query), fields(entries = self.index.len()))]
    async fn search(&self, query: &EmbeddingVector, limit: usize) -> Result<Vec<SearchResult>> {
        self.index.search(query, limit)
    }

    fn get(&self, key: &str) -> Option<IndexedEntry> {
        self.index.get(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}
