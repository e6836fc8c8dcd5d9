//! End-to-end tests: the real classifier trained on a tiny separable dataset
//!
//! - Curves, checkpoint, ROC and event files land in the output directory
//! - Training loss goes down
//! - The dataset loader accepts class indices and one-hot labels

use conv_classifier::config::ClassifierConfig;
use conv_classifier::data::{load_dataset, Dataset, Split};
use conv_classifier::model::ConvClassifier;
use conv_classifier::training::{Trainer, TrainingSchedule, EVENTS_FILE};
use conv_classifier::Error;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const INPUT_DIM: usize = 16;

fn config(output_dir: &Path) -> ClassifierConfig {
    let mut config = ClassifierConfig::from_json_str(
        r#"{
            "batch_size": 8,
            "learning_rate": 0.01,
            "require_improvement": 40,
            "seed": 5,
            "num_iterations": 60,
            "input_channels": 1,
            "input_height": 4,
            "input_width": 4,
            "num_classes": 2,
            "batch_norm": true,
            "keep_prob": 0.9,
            "l2_reg": 0.0001,
            "filter_sizes": [3, 3],
            "num_filters": [2, 3],
            "fc_size": 8,
            "feature_dim": 4,
            "hidden_dim": 8,
            "valid_idx": 2,
            "test_idx": 3,
            "ratio_observation": 0.5
        }"#,
    )
    .unwrap();
    config.output_dir = Some(output_dir.to_path_buf());
    config
}

// Class 1 rows are bright, class 0 rows are dark.
fn separable_split(rows: usize, offset: usize) -> Split {
    let mut features = Vec::with_capacity(rows * INPUT_DIM);
    let mut classes = Vec::with_capacity(rows);
    for r in 0..rows {
        let class = (r + offset) % 2;
        let base = if class == 1 { 0.8 } else { -0.8 };
        for k in 0..INPUT_DIM {
            features.push(base + ((r * 7 + k * 3) % 5) as f32 * 0.05);
        }
        classes.push(class);
    }
    Split::from_class_indices(features, &classes, INPUT_DIM, 2).unwrap()
}

fn dataset() -> Dataset {
    Dataset::new(separable_split(24, 0), separable_split(10, 1), separable_split(10, 0)).unwrap()
}

#[test]
fn test_train_test_writes_artifacts_and_reports() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let classifier = ConvClassifier::new(&config).unwrap();
    let schedule = TrainingSchedule::from_config(&config).unwrap();
    let mut trainer = Trainer::new(classifier, dataset(), schedule).unwrap();

    let report = trainer.train_test().unwrap();

    assert!((0.0..=1.0).contains(&report.accuracy));
    assert!((0.0..=1.0).contains(&report.f1));
    assert!((0.0..=1.0).contains(&report.auc));
    assert!(report.loss.is_finite());
    assert!(report.restored);

    for name in [
        "conv_model.json",
        "Cross_Entropy_Loss_2_3.csv",
        "Accuracy_2_3.csv",
        "CONV_2_3_roc.csv",
        EVENTS_FILE,
    ] {
        assert!(dir.path().join(name).is_file(), "missing {name}");
    }

    let steps = trainer.history().len();
    let events = fs::read_to_string(dir.path().join(EVENTS_FILE)).unwrap();
    assert_eq!(events.lines().count(), steps);
}

#[test]
fn test_training_loss_decreases() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let classifier = ConvClassifier::new(&config).unwrap();
    let schedule = TrainingSchedule::from_config(&config).unwrap();
    let mut trainer = Trainer::new(classifier, dataset(), schedule).unwrap();

    trainer.train().unwrap();

    let costs = &trainer.history().train_cost;
    let first: f32 = costs[..3].iter().sum::<f32>() / 3.0;
    let last: f32 = costs[costs.len() - 3..].iter().sum::<f32>() / 3.0;
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_class_count_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path());
    config.num_classes = 3;
    config.ratio_observation = None;
    let classifier = ConvClassifier::new(&config).unwrap();
    let schedule = TrainingSchedule::from_config(&config).unwrap();

    assert!(Trainer::new(classifier, dataset(), schedule).is_err());
}

#[test]
fn test_input_width_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path());
    config.input_width = 5;
    let classifier = ConvClassifier::new(&config).unwrap();
    let schedule = TrainingSchedule::from_config(&config).unwrap();

    assert!(matches!(
        Trainer::new(classifier, dataset(), schedule),
        Err(Error::InvalidShape(_))
    ));
}

#[test]
fn test_load_dataset_accepts_both_label_forms() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(
        &path,
        r#"{
            "train": {"features": [[0.1, 0.2], [0.3, 0.4]], "labels": [0, 1]},
            "valid": {"features": [[0.5, 0.6]], "labels": [[0.0, 1.0]]},
            "test":  {"features": [[0.7, 0.8]], "labels": [1]}
        }"#,
    )
    .unwrap();

    let data = load_dataset(&path, 2, 2).unwrap();

    assert_eq!(data.train.rows(), 2);
    assert_eq!(data.valid.classes(), vec![1]);
    assert_eq!(data.test.labels(), &[0.0, 1.0]);
}

#[test]
fn test_load_dataset_rejects_ragged_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(
        &path,
        r#"{
            "train": {"features": [[0.1, 0.2], [0.3]], "labels": [0, 1]},
            "valid": {"features": [[0.5, 0.6]], "labels": [1]},
            "test":  {"features": [[0.7, 0.8]], "labels": [1]}
        }"#,
    )
    .unwrap();

    assert!(load_dataset(&path, 2, 2).is_err());
}
