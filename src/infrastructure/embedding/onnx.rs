use std::path::Path;
use std::sync::Mutex;

use ndarray::{Axis, Ix2};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::info;

use crate::domain::{
    ports::{HiddenStates, ModelInference, ModelInput},
    Result, RetrievalError,
};

fn fault(e: impl std::fmt::Display) -> RetrievalError {
    RetrievalError::inference(e.to_string())
}

/// ONNX Runtime session for a sentence-transformer graph taking
/// `input_ids`, `attention_mask`, `token_type_ids` and returning
/// `last_hidden_state` as its first output.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel").finish_non_exhaustive()
    }
}

impl OnnxModel {
    pub fn from_file(model_path: impl AsRef<Path>, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(RetrievalError::config(format!(
                "ONNX model file not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(fault)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(fault)?
            .with_intra_threads(intra_threads.max(1))
            .map_err(fault)?
            .commit_from_file(model_path)
            .map_err(fault)?;

        info!(path = %model_path.display(), intra_threads, "ONNX model loaded");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl ModelInference for OnnxModel {
    fn infer(&self, input: &ModelInput) -> Result<HiddenStates> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| RetrievalError::internal(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => Value::from_array(input.input_ids.clone()).map_err(fault)?,
                "attention_mask" => Value::from_array(input.attention_mask.clone()).map_err(fault)?,
                "token_type_ids" => Value::from_array(input.token_type_ids.clone()).map_err(fault)?
            ])
            .map_err(fault)?;

        // [batch, positions, features]
        let output = outputs[0].try_extract_array::<f32>().map_err(fault)?;
        if output.ndim() != 3 {
            return Err(RetrievalError::inference(format!(
                "unexpected output shape {:?}, expected [batch, positions, features]",
                output.shape()
            )));
        }

        let states = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(fault)?
            .to_owned();

        Ok(HiddenStates::new(states))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::EmbeddingService;
    use crate::infrastructure::embedding::{EmbedderSettings, HfTokenizer, SentenceEmbedder};
    use std::sync::Arc;

    const MODEL_PATH: &str = "models/all-MiniLM-L6-v2/model.onnx";
    const TOKENIZER_PATH: &str = "models/all-MiniLM-L6-v2/tokenizer.json";

    #[test]
    fn test_missing_model_is_config_error() {
        let err = OnnxModel::from_file("/nonexistent/model.onnx", 1).unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_minilm_embedding() {
        let embedder = SentenceEmbedder::new(
            Arc::new(HfTokenizer::from_file(TOKENIZER_PATH).unwrap()),
            Arc::new(OnnxModel::from_file(MODEL_PATH, 2).unwrap()),
            EmbedderSettings::default(),
        )
        .unwrap();

        let cat = embedder.embed("the cat sat on the mat").await.unwrap();
        let stocks = embedder.embed("stock market prices rose today").await.unwrap();
        let query = embedder.embed("cat mat").await.unwrap();

        assert_eq!(cat.dimension(), 384);
        assert!((cat.norm() - 1.0).abs() < 1e-4);
        assert!(query.cosine_similarity(&cat) > query.cosine_similarity(&stocks));
    }
}
