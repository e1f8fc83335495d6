use ndarray::{Array2, ArrayView2};

use crate::domain::{Result, RetrievalError};

/// One fixed-length sequence, shaped as a batch of one: `(1, sequence_length)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl ModelInput {
    /// Places `ids` at the front of zero-padded rows of `sequence_length`.
    /// Ids beyond `sequence_length` are dropped.
    pub fn padded(ids: &[u32], sequence_length: usize) -> Self {
        let count = ids.len().min(sequence_length);

        let mut input_ids = Array2::<i64>::zeros((1, sequence_length));
        let mut attention_mask = Array2::<i64>::zeros((1, sequence_length));
        let token_type_ids = Array2::<i64>::zeros((1, sequence_length));

        for (i, &id) in ids.iter().take(count).enumerate() {
            input_ids[[0, i]] = i64::from(id);
            attention_mask[[0, i]] = 1;
        }

        Self {
            input_ids,
            attention_mask,
            token_type_ids,
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.input_ids.ncols()
    }

    /// Positions covered by the attention mask.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Per-position model output, `(positions, features)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenStates(Array2<f32>);

impl HiddenStates {
    pub fn new(states: Array2<f32>) -> Self {
        Self(states)
    }

    pub fn from_shape_vec(positions: usize, features: usize, values: Vec<f32>) -> Result<Self> {
        Array2::from_shape_vec((positions, features), values)
            .map(Self)
            .map_err(|e| RetrievalError::inference(format!("bad hidden state shape: {e}")))
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.0.view()
    }

    pub fn positions(&self) -> usize {
        self.0.nrows()
    }

    pub fn features(&self) -> usize {
        self.0.ncols()
    }
}

/// Black-box encoder: token ids in, per-token hidden states out.
pub trait ModelInference: Send + Sync {
    fn infer(&self, input: &ModelInput) -> Result<HiddenStates>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_input_layout() {
        let input = ModelInput::padded(&[101, 7, 8, 102], 6);

        assert_eq!(input.sequence_length(), 6);
        assert_eq!(input.real_tokens(), 4);
        assert_eq!(input.input_ids.row(0).to_vec(), vec![101, 7, 8, 102, 0, 0]);
        assert_eq!(input.attention_mask.row(0).to_vec(), vec![1, 1, 1, 1, 0, 0]);
        assert!(input.token_type_ids.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_padded_input_drops_overflow() {
        let input = ModelInput::padded(&[1, 2, 3, 4], 2);
        assert_eq!(input.input_ids.row(0).to_vec(), vec![1, 2]);
        assert_eq!(input.real_tokens(), 2);
    }

    #[test]
    fn test_hidden_states_shape_check() {
        assert!(HiddenStates::from_shape_vec(2, 3, vec![0.0; 6]).is_ok());
        let err = HiddenStates::from_shape_vec(2, 3, vec![0.0; 5]).unwrap_err();
        assert!(err.is_inference_fault());
    }
}
