use std::path::Path;

use tokenizers::Tokenizer as HfInner;

use crate::domain::{
    ports::{SpecialTokens, Tokenizer},
    Result, RetrievalError,
};

/// HuggingFace `tokenizers` adapter loaded from a `tokenizer.json`.
///
/// Truncation, padding and the post-processor are disabled; the embedding
/// pipeline frames and pads sequences itself.
pub struct HfTokenizer {
    inner: HfInner,
    special: SpecialTokens,
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("special", &self.special)
            .field("vocab_size", &self.inner.get_vocab_size(true))
            .finish()
    }
}

impl HfTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = HfInner::from_file(path).map_err(|e| {
            RetrievalError::tokenization(format!(
                "failed to load tokenizer {}: {e}",
                path.display()
            ))
        })?;
        Self::from_inner(inner)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let inner = HfInner::from_bytes(json.as_bytes())
            .map_err(|e| RetrievalError::tokenization(format!("invalid tokenizer json: {e}")))?;
        Self::from_inner(inner)
    }

    fn from_inner(mut inner: HfInner) -> Result<Self> {
        inner
            .with_truncation(None)
            .map_err(|e| RetrievalError::tokenization(e.to_string()))?;
        inner.with_padding(None);

        let special = SpecialTokens {
            begin: inner
                .token_to_id("[CLS]")
                .unwrap_or(SpecialTokens::BERT.begin),
            end: inner.token_to_id("[SEP]").unwrap_or(SpecialTokens::BERT.end),
        };

        Ok(Self { inner, special })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.inner
            .encode(text, false)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| RetrievalError::tokenization(e.to_string()))
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}
