use crate::domain::Result;

/// Sentinel ids framing every sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub begin: u32,
    pub end: u32,
}

impl SpecialTokens {
    /// BERT `[CLS]` / `[SEP]`.
    pub const BERT: Self = Self {
        begin: 101,
        end: 102,
    };
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self::BERT
    }
}

pub trait Tokenizer: Send + Sync {
    /// Token ids for `text`, without sentinels, truncation or padding.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens::default()
    }
}
