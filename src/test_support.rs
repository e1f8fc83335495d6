//! Deterministic stand-ins for the tokenizer and model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;

use crate::domain::ports::{HiddenStates, ModelInference, ModelInput, Tokenizer};
use crate::domain::{Result, RetrievalError};
use crate::infrastructure::embedding::{EmbedderSettings, SentenceEmbedder};

pub(crate) const TEST_DIMENSION: usize = 384;

const UNKNOWN_ID: u32 = 100;
const FIRST_WORD_ID: u32 = 1000;

const DEFAULT_VOCAB: &[&str] = &[
    "the", "cat", "sat", "on", "mat", "stock", "market", "prices", "rose", "today", "dog", "ran",
    "in", "park", "hello", "world",
];

/// Whitespace tokenizer over a fixed vocabulary; unknown words map to 100.
pub(crate) struct VocabTokenizer {
    vocab: HashMap<String, u32>,
}

impl VocabTokenizer {
    pub(crate) fn new(words: &[&str]) -> Self {
        let vocab = words
            .iter()
            .zip(FIRST_WORD_ID..)
            .map(|(w, id)| (w.to_string(), id))
            .collect();
        Self { vocab }
    }
}

impl Default for VocabTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_VOCAB)
    }
}

impl Tokenizer for VocabTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text
            .split_whitespace()
            .map(|w| {
                let word = w
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                self.vocab.get(&word).copied().unwrap_or(UNKNOWN_ID)
            })
            .collect())
    }
}

pub(crate) struct FailingTokenizer;

impl Tokenizer for FailingTokenizer {
    fn encode(&self, _text: &str) -> Result<Vec<u32>> {
        Err(RetrievalError::tokenization("vocabulary not loaded"))
    }
}

/// One-hot per position at feature `id % dimension`, padding included, so a
/// pooled vector is a normalized bag of words.
pub(crate) struct BagOfWordsModel {
    dimension: usize,
}

impl BagOfWordsModel {
    pub(crate) fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl ModelInference for BagOfWordsModel {
    fn infer(&self, input: &ModelInput) -> Result<HiddenStates> {
        let positions = input.sequence_length();
        let mut states = Array2::<f32>::zeros((positions, self.dimension));
        for (i, &id) in input.input_ids.row(0).iter().enumerate() {
            states[[i, id as usize % self.dimension]] = 1.0;
        }
        Ok(HiddenStates::new(states))
    }
}

pub(crate) struct FailingModel;

impl ModelInference for FailingModel {
    fn infer(&self, _input: &ModelInput) -> Result<HiddenStates> {
        Err(RetrievalError::inference("session crashed"))
    }
}

pub(crate) struct SlowModel {
    inner: BagOfWordsModel,
    delay: Duration,
}

impl SlowModel {
    pub(crate) fn new(dimension: usize, delay: Duration) -> Self {
        Self {
            inner: BagOfWordsModel::new(dimension),
            delay,
        }
    }
}

impl ModelInference for SlowModel {
    fn infer(&self, input: &ModelInput) -> Result<HiddenStates> {
        std::thread::sleep(self.delay);
        self.inner.infer(input)
    }
}

pub(crate) fn embedder() -> SentenceEmbedder {
    SentenceEmbedder::new(
        Arc::new(VocabTokenizer::default()),
        Arc::new(BagOfWordsModel::new(TEST_DIMENSION)),
        EmbedderSettings {
            dimension: TEST_DIMENSION,
            max_sequence_length: 64,
            timeout: None,
        },
    )
    .expect("valid test settings")
}
