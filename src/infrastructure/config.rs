use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::{Result, RetrievalError, DEFAULT_DIMENSION, DEFAULT_MAX_CHUNK_CHARS};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub chunking: ChunkingConfig,
    pub search: SearchConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub max_sequence_length: usize,
    /// Zero disables the deadline.
    pub inference_timeout_ms: u64,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub intra_threads: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            max_sequence_length: DEFAULT_DIMENSION,
            inference_timeout_ms: 30_000,
            model_path: PathBuf::from("model.onnx"),
            tokenizer_path: PathBuf::from("tokenizer.json"),
            intra_threads: 4,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("vectors.bin"),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Config {
    /// Defaults, then the YAML file if given, then `RAG_*` environment
    /// variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RetrievalError::config(format!("invalid config yaml: {e}")))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let embedding = &mut self.embedding;
        override_parsed(&lookup, "RAG_EMBEDDING_DIMENSION", &mut embedding.dimension)?;
        override_parsed(
            &lookup,
            "RAG_MAX_SEQUENCE_LENGTH",
            &mut embedding.max_sequence_length,
        )?;
        override_parsed(
            &lookup,
            "RAG_INFERENCE_TIMEOUT_MS",
            &mut embedding.inference_timeout_ms,
        )?;
        override_parsed(&lookup, "RAG_MODEL_PATH", &mut embedding.model_path)?;
        override_parsed(&lookup, "RAG_TOKENIZER_PATH", &mut embedding.tokenizer_path)?;
        override_parsed(&lookup, "RAG_INTRA_THREADS", &mut embedding.intra_threads)?;

        override_parsed(&lookup, "RAG_LOG_PATH", &mut self.store.log_path)?;
        override_parsed(
            &lookup,
            "RAG_MAX_CHUNK_CHARS",
            &mut self.chunking.max_chunk_chars,
        )?;
        override_parsed(&lookup, "RAG_SEARCH_LIMIT", &mut self.search.default_limit)?;
        override_parsed(
            &lookup,
            "RAG_INGEST_CONCURRENCY",
            &mut self.ingestion.concurrency,
        )?;
        Ok(())
    }
}

fn override_parsed<T, F>(lookup: &F, name: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| RetrievalError::config(format!("{name}={raw:?}: {e}")))?;
    }
    Ok(())
}
