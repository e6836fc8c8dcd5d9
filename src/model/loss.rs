//! Softmax cross-entropy over per-class scores

use crate::utils::{argmax_rows, softmax_rows};

/// Result of a softmax cross-entropy evaluation on one batch.
#[derive(Debug, Clone)]
pub struct SoftmaxCrossEntropy {
    /// Mean cross-entropy over the rows
    pub mean_loss: f32,
    /// Row-wise softmax probabilities
    pub probs: Vec<f32>,
    /// Argmax class per row
    pub predictions: Vec<usize>,
}

/// Mean softmax cross-entropy of `logits` against (one-hot) `labels`.
///
/// Uses the log-sum-exp form, so large scores do not overflow.
pub fn softmax_cross_entropy(
    logits: &[f32],
    labels: &[f32],
    rows: usize,
    cols: usize,
) -> SoftmaxCrossEntropy {
    assert_eq!(logits.len(), rows * cols, "logits length mismatch");
    assert_eq!(labels.len(), rows * cols, "labels length mismatch");

    let mut total = 0.0f32;
    for (z, y) in logits.chunks_exact(cols).zip(labels.chunks_exact(cols)) {
        let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = z.iter().map(|&v| (v - max).exp()).sum::<f32>().ln() + max;
        for (&zj, &yj) in z.iter().zip(y) {
            total -= yj * (zj - log_sum);
        }
    }

    let mut probs = logits.to_vec();
    softmax_rows(&mut probs, rows, cols);
    let predictions = argmax_rows(&probs, rows, cols);

    SoftmaxCrossEntropy {
        mean_loss: if rows == 0 { 0.0 } else { total / rows as f32 },
        probs,
        predictions,
    }
}

/// Gradient of the mean cross-entropy with respect to the logits.
///
/// `(p * Σy - y) / rows`, which is `(p - y) / rows` for one-hot labels.
pub fn cross_entropy_delta(probs: &[f32], labels: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    assert_eq!(probs.len(), labels.len(), "probs/labels length mismatch");
    let scale = 1.0 / rows.max(1) as f32;
    let mut delta = vec![0.0f32; probs.len()];
    for ((d, p), y) in delta
        .chunks_exact_mut(cols)
        .zip(probs.chunks_exact(cols))
        .zip(labels.chunks_exact(cols))
    {
        let mass: f32 = y.iter().sum();
        for j in 0..cols {
            d[j] = (p[j] * mass - y[j]) * scale;
        }
    }
    delta
}
