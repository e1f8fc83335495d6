use serde::{Deserialize, Serialize};

/// Output width of the all-MiniLM-L6-v2 sentence encoder.
pub const DEFAULT_DIMENSION: usize = 384;

/// Norms at or below this are treated as zero.
const NORM_EPSILON: f64 = 1e-12;

/// Fixed-length embedding, L2-normalized when produced by the embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f64 {
        self.0
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.norm() <= NORM_EPSILON
    }

    /// Divides by the Euclidean norm. A zero vector comes back unchanged.
    pub fn l2_normalized(mut self) -> Self {
        let norm = self.norm();
        if norm <= NORM_EPSILON {
            return self;
        }
        for x in &mut self.0 {
            *x = (f64::from(*x) / norm) as f32;
        }
        self
    }

    pub fn dot(&self, other: &EmbeddingVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum()
    }

    /// Cosine similarity in `[-1, 1]`; `0.0` for mismatched lengths, empty
    /// vectors or a zero norm on either side.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }

        let dot = self.dot(other);
        let denom = self.norm() * other.norm();
        if denom <= NORM_EPSILON || !dot.is_finite() {
            return 0.0;
        }

        (dot / denom).clamp(-1.0, 1.0) as f32
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
