use ndarray::{s, Array1, ArrayView2, Axis};

use crate::domain::EmbeddingVector;

/// Averages the first `count` rows (the attention-masked positions) of
/// `states`, dividing by `max(1, count)`.
pub fn masked_mean_pool(states: ArrayView2<'_, f32>, count: usize) -> Array1<f32> {
    let count = count.min(states.nrows());
    let summed = states.slice(s![..count, ..]).sum_axis(Axis(0));
    summed / count.max(1) as f32
}

/// Mean pooling followed by L2 normalization.
pub fn pool_and_normalize(states: ArrayView2<'_, f32>, count: usize) -> EmbeddingVector {
    EmbeddingVector::from(masked_mean_pool(states, count).to_vec()).l2_normalized()
}
