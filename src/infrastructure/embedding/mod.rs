mod pipeline;
pub mod pooling;
mod tokenizer;

#[cfg(feature = "onnx")]
mod onnx;

pub use pipeline::{EmbedderSettings, SentenceEmbedder};
pub use tokenizer::HfTokenizer;

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
