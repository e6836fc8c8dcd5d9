//! Activation functions applied between layers
//!
//! - ReLU (forward in place, backward as a gradient mask)
//! - Softmax (row-wise, numerically stable)
//! - Row-wise argmax for class predictions

/// ReLU activation function applied in-place.
///
/// Sets all negative values to 0.0, keeps positive values unchanged.
pub fn relu_inplace(data: &mut [f32]) {
    for value in data.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// ReLU backward: zero gradients where the post-ReLU activation was <= 0.
pub fn relu_backward_inplace(activations: &[f32], grad: &mut [f32]) {
    assert_eq!(
        activations.len(),
        grad.len(),
        "activation/gradient length mismatch in relu_backward_inplace"
    );
    for (g, &a) in grad.iter_mut().zip(activations) {
        if a <= 0.0 {
            *g = 0.0;
        }
    }
}

/// Softmax activation function applied row-wise.
///
/// Converts logits to probabilities for each row. Uses the max-subtraction
/// trick for numerical stability to avoid overflow with large values.
///
/// # Arguments
/// * `outputs` - Flat array containing row-major matrix data
/// * `rows` - Number of rows in the matrix
/// * `cols` - Number of columns in the matrix
pub fn softmax_rows(outputs: &mut [f32], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols).take(rows) {
        let mut max_value = row[0];
        for &value in row.iter().skip(1) {
            if value > max_value {
                max_value = value;
            }
        }

        let mut sum = 0.0f32;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0f32 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}

/// Index of the largest value in each row. Ties resolve to the lowest index.
pub fn argmax_rows(data: &[f32], rows: usize, cols: usize) -> Vec<usize> {
    assert_eq!(data.len(), rows * cols, "data length mismatch in argmax_rows");
    data.chunks_exact(cols)
        .take(rows)
        .map(|row| {
            let mut best = row[0];
            let mut arg = 0usize;
            for (j, &v) in row.iter().enumerate().skip(1) {
                if v > best {
                    best = v;
                    arg = j;
                }
            }
            arg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON_F32: f32 = 1e-6;

    #[test]
    fn test_relu_mixed() {
        let mut data = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        relu_inplace(&mut data);
        assert_eq!(data, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_relu_backward_masks_inactive_units() {
        let activations = vec![0.0, 1.5, 0.0, 3.0];
        let mut grad = vec![1.0, 1.0, -2.0, -2.0];
        relu_backward_inplace(&activations, &mut grad);
        assert_eq!(grad, vec![0.0, 1.0, 0.0, -2.0]);
    }

    #[test]
    fn test_softmax_single_row_sum() {
        let mut data = vec![1.0, 2.0, 3.0];
        softmax_rows(&mut data, 1, 3);
        let sum: f32 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON_F32);
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let mut data = vec![1000.0, 1001.0, 1002.0];
        softmax_rows(&mut data, 1, 3);
        let sum: f32 = data.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON_F32);
        assert!(!data.iter().any(|&x| x.is_nan() || x.is_infinite()));
    }

    #[test]
    fn test_argmax_rows_ties_pick_first() {
        let data = vec![0.1, 0.9, 0.5, 0.5, -1.0, -2.0];
        assert_eq!(argmax_rows(&data, 3, 2), vec![1, 0, 0]);
    }
}
