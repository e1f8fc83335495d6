use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::{
    ports::{EmbeddingService, ModelInference, ModelInput, Tokenizer},
    EmbeddingVector, Result, RetrievalError, DEFAULT_DIMENSION,
};
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::embedding::pooling::pool_and_normalize;

/// Slots reserved for the begin/end sentinels.
const SENTINEL_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedderSettings {
    /// Feature width the model must produce.
    pub dimension: usize,
    /// Padded sequence length fed to the model, sentinels included.
    pub max_sequence_length: usize,
    /// Deadline per embed call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            max_sequence_length: DEFAULT_DIMENSION,
            timeout: None,
        }
    }
}

impl From<&EmbeddingConfig> for EmbedderSettings {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            dimension: config.dimension,
            max_sequence_length: config.max_sequence_length,
            timeout: (config.inference_timeout_ms > 0)
                .then(|| Duration::from_millis(config.inference_timeout_ms)),
        }
    }
}

impl EmbedderSettings {
    fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(RetrievalError::validation("embedding dimension must be positive"));
        }
        if self.max_sequence_length < SENTINEL_SLOTS {
            return Err(RetrievalError::validation(format!(
                "max_sequence_length must be at least {SENTINEL_SLOTS}, got {}",
                self.max_sequence_length
            )));
        }
        Ok(())
    }
}

/// Sentence embedder: tokenize, frame with sentinels, run the model,
/// mean-pool over real tokens, L2-normalize.
#[derive(Clone)]
pub struct SentenceEmbedder {
    tokenizer: Arc<dyn Tokenizer>,
    model: Arc<dyn ModelInference>,
    settings: EmbedderSettings,
}

impl std::fmt::Debug for SentenceEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceEmbedder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SentenceEmbedder {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        model: Arc<dyn ModelInference>,
        settings: EmbedderSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            tokenizer,
            model,
            settings,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    pub fn settings(&self) -> &EmbedderSettings {
        &self.settings
    }

    /// Runs the pipeline on the calling thread.
    pub fn embed_blocking(&self, text: &str) -> Result<EmbeddingVector> {
        run_pipeline(
            self.tokenizer.as_ref(),
            self.model.as_ref(),
            &self.settings,
            text,
        )
    }
}

fn run_pipeline(
    tokenizer: &dyn Tokenizer,
    model: &dyn ModelInference,
    settings: &EmbedderSettings,
    text: &str,
) -> Result<EmbeddingVector> {
    let mut ids = tokenizer.encode(text)?;

    let capacity = settings.max_sequence_length - SENTINEL_SLOTS;
    let truncated = ids.len() > capacity;
    ids.truncate(capacity);

    let special = tokenizer.special_tokens();
    let mut framed = Vec::with_capacity(ids.len() + SENTINEL_SLOTS);
    framed.push(special.begin);
    framed.extend_from_slice(&ids);
    framed.push(special.end);
    let count = framed.len();

    let input = ModelInput::padded(&framed, settings.max_sequence_length);
    let states = model.infer(&input)?;

    if states.features() != settings.dimension {
        return Err(RetrievalError::inference(format!(
            "model produced {} features, expected {}",
            states.features(),
            settings.dimension
        )));
    }
    if states.positions() < count {
        return Err(RetrievalError::inference(format!(
            "model produced {} positions for {} tokens",
            states.positions(),
            count
        )));
    }

    debug!(tokens = count, truncated, "embedded text");
    Ok(pool_and_normalize(states.view(), count))
}

#[async_trait]
impl EmbeddingService for SentenceEmbedder {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let tokenizer = self.tokenizer.clone();
        let model = self.model.clone();
        let settings = self.settings.clone();
        let text = text.to_owned();

        let task = tokio::task::spawn_blocking(move || {
            run_pipeline(tokenizer.as_ref(), model.as_ref(), &settings, &text)
        });

        // On deadline the blocking task is left to finish and its output dropped.
        let joined = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| RetrievalError::InferenceTimeout(limit))?,
            None => task.await,
        };

        joined.map_err(|e| RetrievalError::inference(format!("embedding task failed: {e}")))?
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.settings.dimension
    }
}
