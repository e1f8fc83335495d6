pub mod config;
pub mod embedding;
pub mod vector_store;

pub use config::Config;
#[cfg(feature = "onnx")]
pub use embedding::OnnxModel;
pub use embedding::{EmbedderSettings, HfTokenizer, SentenceEmbedder};
pub use vector_store::{CompactionStats, PersistentVectorStore};
