//! Evaluation metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop):
//! accuracy over a correctness mask, F1, ROC curves and their area.

use tracing::{debug, info, warn};

/// Element-wise `predicted == truth`.
pub fn correct_predictions(predicted: &[usize], truth: &[usize]) -> Vec<bool> {
    assert_eq!(predicted.len(), truth.len(), "prediction/label count mismatch");
    predicted.iter().zip(truth).map(|(p, t)| p == t).collect()
}

/// Fraction and count of `true` entries. An empty mask scores zero.
pub fn cls_accuracy(correct: &[bool]) -> (f32, usize) {
    let correct_sum = correct.iter().filter(|&&c| c).count();
    if correct.is_empty() {
        return (0.0, 0);
    }
    (correct_sum as f32 / correct.len() as f32, correct_sum)
}

/// `matrix[true][predicted]` counts.
pub fn confusion_matrix(truth: &[usize], predicted: &[usize], num_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; num_classes]; num_classes];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < num_classes && p < num_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

fn class_f1(truth: &[usize], predicted: &[usize], class: usize) -> f32 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&t, &p) in truth.iter().zip(predicted) {
        match (t == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let precision = if tp + fp == 0 { 0.0 } else { tp as f32 / (tp + fp) as f32 };
    let recall = if tp + fn_ == 0 { 0.0 } else { tp as f32 / (tp + fn_) as f32 };
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// F1 score: binary with class 1 positive when `num_classes == 2`,
/// unweighted mean over classes otherwise.
pub fn f1_score(truth: &[usize], predicted: &[usize], num_classes: usize) -> f32 {
    assert_eq!(truth.len(), predicted.len(), "prediction/label count mismatch");
    if num_classes == 2 {
        return class_f1(truth, predicted, 1);
    }
    if num_classes == 0 {
        return 0.0;
    }
    let total: f32 = (0..num_classes).map(|c| class_f1(truth, predicted, c)).sum();
    total / num_classes as f32
}

/// Receiver operating characteristic of one score column.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f32>,
    pub tpr: Vec<f32>,
    /// Score threshold of each point; the first point uses +∞.
    pub thresholds: Vec<f32>,
}

impl RocCurve {
    /// Trapezoidal area under the curve.
    pub fn area(&self) -> f32 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[1] + y[0]) / 2.0)
            .sum()
    }
}

/// ROC curve for `scores` against binary `positives`.
///
/// Returns `None` when either class is absent or a score is not finite,
/// since the rates are undefined.
pub fn roc_curve(scores: &[f32], positives: &[bool]) -> Option<RocCurve> {
    assert_eq!(scores.len(), positives.len(), "score/label count mismatch");
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        warn!("ROC curve skipped: non-finite score {bad}");
        return None;
    }
    let total_pos = positives.iter().filter(|&&p| p).count();
    let total_neg = positives.len() - total_pos;
    if total_pos == 0 || total_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f32::INFINITY],
    };
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        // Tied scores move together, producing a diagonal segment
        while i < order.len() && scores[order[i]].total_cmp(&threshold).is_eq() {
            if positives[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        curve.fpr.push(fp as f32 / total_neg as f32);
        curve.tpr.push(tp as f32 / total_pos as f32);
        curve.thresholds.push(threshold);
    }
    Some(curve)
}

/// Area under the ROC curve, `None` when undefined.
pub fn roc_auc(scores: &[f32], positives: &[bool]) -> Option<f32> {
    roc_curve(scores, positives).map(|curve| curve.area())
}

/// ROC analysis of a test pass.
#[derive(Debug, Clone)]
pub struct TestRoc {
    /// Binary AUC, macro one-vs-rest AUC, or NaN when undefined
    pub auc: f32,
    /// `(class, curve)` for every class whose curve is defined
    pub curves: Vec<(usize, RocCurve)>,
}

/// ROC-AUC from row-major `logits` and true class indices.
///
/// With two classes the class-1 score ranks the samples; with more classes
/// the one-vs-rest AUCs are averaged over the classes where both outcomes
/// occur.
pub fn roc_from_logits(logits: &[f32], truth: &[usize], num_classes: usize) -> TestRoc {
    assert_eq!(logits.len(), truth.len() * num_classes, "logits length mismatch");

    let column = |class: usize| -> Vec<f32> {
        logits.chunks_exact(num_classes).map(|row| row[class]).collect()
    };
    let classes: Vec<usize> = if num_classes == 2 { vec![1] } else { (0..num_classes).collect() };

    let mut curves = Vec::new();
    for class in classes {
        let positives: Vec<bool> = truth.iter().map(|&t| t == class).collect();
        if let Some(curve) = roc_curve(&column(class), &positives) {
            curves.push((class, curve));
        }
    }

    let auc = if curves.is_empty() {
        warn!("ROC-AUC is undefined: single-class labels or non-finite scores");
        f32::NAN
    } else {
        curves.iter().map(|(_, c)| c.area()).sum::<f32>() / curves.len() as f32
    };
    TestRoc { auc, curves }
}

/// Log test accuracy and the confusion matrix; returns the accuracy.
pub fn log_test_accuracy(
    correct: &[bool],
    predicted: &[usize],
    truth: &[usize],
    num_classes: usize,
) -> f32 {
    let (accuracy, correct_sum) = cls_accuracy(correct);
    info!(
        "Accuracy on Test-Set: {:.1}% ({} / {})",
        accuracy * 100.0,
        correct_sum,
        correct.len()
    );
    for (class, row) in confusion_matrix(truth, predicted, num_classes).iter().enumerate() {
        debug!("confusion[{class}]: {row:?}");
    }
    accuracy
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cls_accuracy() {
        assert_eq!(cls_accuracy(&[true, false, true, true]), (0.75, 3));
        assert_eq!(cls_accuracy(&[]), (0.0, 0));
    }

    #[test]
    fn test_binary_f1() {
        // tp = 2, fp = 1, fn = 1
        let truth = [1, 1, 1, 0, 0];
        let predicted = [1, 1, 0, 1, 0];
        assert_relative_eq!(f1_score(&truth, &predicted, 2), 2.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_f1_zero_without_positive_hits() {
        assert_eq!(f1_score(&[0, 0, 1], &[0, 0, 0], 2), 0.0);
    }

    #[test]
    fn test_macro_f1_perfect() {
        let truth = [0, 1, 2, 2];
        assert_relative_eq!(f1_score(&truth, &truth, 3), 1.0);
    }

    #[test]
    fn test_auc_perfect_and_reversed() {
        let positives = [false, false, true, true];
        assert_relative_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &positives).unwrap(), 1.0);
        assert_relative_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &positives).unwrap(), 0.0);
    }

    #[test]
    fn test_auc_ties_count_half() {
        let positives = [false, true];
        assert_relative_eq!(roc_auc(&[0.5, 0.5], &positives).unwrap(), 0.5);
    }

    #[test]
    fn test_auc_known_value() {
        // 3 of the 4 positive/negative pairs are ordered correctly
        let scores = [0.1, 0.4, 0.35, 0.8];
        let positives = [false, false, true, true];
        assert_relative_eq!(roc_auc(&scores, &positives).unwrap(), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_auc_undefined_for_single_class() {
        assert!(roc_auc(&[0.1, 0.9], &[true, true]).is_none());

        let roc = roc_from_logits(&[0.0, 1.0, 0.5, 0.2], &[1, 1], 2);
        assert!(roc.auc.is_nan());
        assert!(roc.curves.is_empty());
    }

    #[test]
    fn test_nan_scores_make_auc_undefined() {
        assert!(roc_curve(&[0.2, f32::NAN, 0.7], &[false, true, true]).is_none());

        let logits = [0.1, f32::NAN, 0.2, 0.9, 0.3, 0.1];
        let roc = roc_from_logits(&logits, &[1, 1, 0], 2);
        assert!(roc.auc.is_nan());
        assert!(roc.curves.is_empty());
    }

    #[test]
    fn test_infinite_scores_are_rejected() {
        let scores = [f32::NEG_INFINITY, 0.5, f32::INFINITY];
        assert!(roc_auc(&scores, &[false, true, true]).is_none());
    }

    #[test]
    fn test_binary_auc_uses_class_one_scores() {
        let logits = [0.9, 0.1, 0.2, 0.8, 0.7, 0.3];
        let roc = roc_from_logits(&logits, &[0, 1, 0], 2);
        assert_relative_eq!(roc.auc, 1.0);
        assert_eq!(roc.curves.len(), 1);
        assert_eq!(roc.curves[0].0, 1);
    }

    #[test]
    fn test_confusion_matrix() {
        let matrix = confusion_matrix(&[0, 1, 1], &[0, 0, 1], 2);
        assert_eq!(matrix, vec![vec![1, 0], vec![1, 1]]);
    }
}
