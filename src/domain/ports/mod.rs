mod embedding;
mod inference;
mod tokenizer;
mod vector_store;

pub use embedding::EmbeddingService;
pub use inference::{HiddenStates, ModelInference, ModelInput};
pub use tokenizer::{SpecialTokens, Tokenizer};
pub use vector_store::VectorStore;
