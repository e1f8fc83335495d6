use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Model inference failed: {0}")]
    Inference(String),

    #[error("Model inference exceeded deadline of {0:?}")]
    InferenceTimeout(Duration),

    #[error("Vector log I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("Vector log corrupt at offset {offset}: {reason}")]
    CorruptLog { offset: u64, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    pub fn tokenization(msg: impl Into<String>) -> Self {
        Self::Tokenization(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptLog {
            offset,
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Model faults and deadline overruns; callers may retry these.
    pub fn is_inference_fault(&self) -> bool {
        matches!(self, Self::Inference(_) | Self::InferenceTimeout(_))
    }

    pub fn is_store_fault(&self) -> bool {
        matches!(self, Self::StoreIo(_) | Self::CorruptLog { .. })
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(RetrievalError::inference("boom").is_inference_fault());
        assert!(RetrievalError::InferenceTimeout(Duration::from_secs(1)).is_inference_fault());
        assert!(!RetrievalError::tokenization("bad").is_inference_fault());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(RetrievalError::from(io).is_store_fault());
        assert!(RetrievalError::corrupt(12, "bad utf-8").is_store_fault());
        assert!(!RetrievalError::internal("poisoned").is_store_fault());
    }

    #[test]
    fn test_corrupt_message_carries_offset() {
        let err = RetrievalError::corrupt(42, "negative vector length");
        assert_eq!(
            err.to_string(),
            "Vector log corrupt at offset 42: negative vector length"
        );
    }
}
