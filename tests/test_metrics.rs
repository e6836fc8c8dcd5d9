//! Tests for the test-set metrics
//!
//! - Accuracy from a correctness mask
//! - Macro one-vs-rest ROC-AUC and F1 with more than two classes
//! - ROC curve end points and monotonicity

use approx::assert_relative_eq;
use conv_classifier::metrics::{
    cls_accuracy, correct_predictions, f1_score, roc_curve, roc_from_logits,
};

#[test]
fn test_accuracy_from_predictions() {
    let correct = correct_predictions(&[0, 1, 1, 2, 0], &[0, 1, 0, 2, 1]);
    assert_eq!(correct, vec![true, true, false, true, false]);

    let (accuracy, count) = cls_accuracy(&correct);
    assert_relative_eq!(accuracy, 0.6);
    assert_eq!(count, 3);
}

#[test]
fn test_macro_auc_three_classes() {
    // Each row scores its own class highest: every one-vs-rest AUC is 1
    #[rustfmt::skip]
    let logits = [
        0.8, 0.1, 0.1,
        0.1, 0.7, 0.2,
        0.2, 0.1, 0.7,
        0.6, 0.3, 0.1,
    ];
    let roc = roc_from_logits(&logits, &[0, 1, 2, 0], 3);

    assert_relative_eq!(roc.auc, 1.0);
    assert_eq!(roc.curves.len(), 3);
}

#[test]
fn test_macro_auc_skips_absent_class() {
    #[rustfmt::skip]
    let logits = [
        0.9, 0.1, 0.0,
        0.2, 0.8, 0.0,
        0.3, 0.7, 0.0,
    ];
    let roc = roc_from_logits(&logits, &[0, 1, 1], 3);

    let classes: Vec<usize> = roc.curves.iter().map(|(c, _)| *c).collect();
    assert_eq!(classes, vec![0, 1]);
    assert_relative_eq!(roc.auc, 1.0);
}

#[test]
fn test_macro_f1_averages_classes() {
    let truth = [0, 0, 1, 1, 2, 2];
    let predicted = [0, 0, 1, 2, 2, 2];
    // class 0: 1.0, class 1: p=1 r=0.5 -> 2/3, class 2: p=2/3 r=1 -> 0.8
    let expected = (1.0 + 2.0 / 3.0 + 0.8) / 3.0;
    assert_relative_eq!(f1_score(&truth, &predicted, 3), expected, epsilon = 1e-6);
}

#[test]
fn test_roc_curve_endpoints_and_monotonic() {
    let scores = [0.9, 0.1, 0.6, 0.4, 0.75, 0.3, 0.6];
    let positives = [true, false, true, false, false, true, false];
    let curve = roc_curve(&scores, &positives).unwrap();

    assert_eq!((curve.fpr[0], curve.tpr[0]), (0.0, 0.0));
    assert_eq!((*curve.fpr.last().unwrap(), *curve.tpr.last().unwrap()), (1.0, 1.0));
    assert!(curve.fpr.windows(2).all(|w| w[0] <= w[1]));
    assert!(curve.tpr.windows(2).all(|w| w[0] <= w[1]));
    assert!(curve.thresholds[0].is_infinite());
    // Tied scores of 0.6 collapse into one point
    assert_eq!(curve.fpr.len(), 7);
}
