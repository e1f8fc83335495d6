mod document;
mod embedding;
mod entry;

pub use document::{
    chunk_text, normalize_line_endings, IngestedDocument, TextChunk, DEFAULT_MAX_CHUNK_CHARS,
};
pub use embedding::{EmbeddingVector, DEFAULT_DIMENSION};
pub use entry::{IndexedEntry, SearchResult};
