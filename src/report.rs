//! CSV export of training curves and ROC curves
//!
//! ```text
//! Cross_Entropy_Loss_0_1.csv
//!   # epochs=3, best_iteration=41
//!   iteration,training,validation
//!   0,0.693147,0.690211
//!   ...
//! ```

use crate::error::Result;
use crate::metrics::RocCurve;
use crate::training::TrainingHistory;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV writer on a new file whose first line is `# <comment>`.
fn commented_writer(path: &Path, comment: &str) -> Result<csv::Writer<File>> {
    let mut file = File::create(path)?;
    writeln!(file, "# {comment}")?;
    Ok(csv::Writer::from_writer(file))
}

/// Write one training/validation curve to `<dir>/<name>.csv`.
pub fn write_curve(
    dir: &Path,
    name: &str,
    training: &[f32],
    validation: &[f32],
    epochs: usize,
    best_iteration: usize,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.csv"));
    let mut w = commented_writer(&path, &format!("epochs={epochs}, best_iteration={best_iteration}"))?;

    w.write_record(["iteration", "training", "validation"])?;
    for (i, (t, v)) in training.iter().zip(validation).enumerate() {
        w.write_record([i.to_string(), format!("{t:.6}"), format!("{v:.6}")])?;
    }
    w.flush()?;

    debug!("Wrote curve '{}'", path.display());
    Ok(path)
}

/// Write the loss and accuracy curves of a run, named after its fold indices.
pub fn write_training_curves(
    dir: &Path,
    history: &TrainingHistory,
    valid_idx: usize,
    test_idx: usize,
    epochs: usize,
    best_iteration: usize,
) -> Result<Vec<PathBuf>> {
    let loss = write_curve(
        dir,
        &format!("Cross_Entropy_Loss_{valid_idx}_{test_idx}"),
        &history.train_cost,
        &history.validation_cost,
        epochs,
        best_iteration,
    )?;
    let accuracy = write_curve(
        dir,
        &format!("Accuracy_{valid_idx}_{test_idx}"),
        &history.train_acc,
        &history.validation_acc,
        epochs,
        best_iteration,
    )?;
    Ok(vec![loss, accuracy])
}

/// Write ROC points to `<dir>/CONV_{valid_idx}_{test_idx}_roc.csv`.
pub fn write_roc(
    dir: &Path,
    valid_idx: usize,
    test_idx: usize,
    curves: &[(usize, RocCurve)],
    auc: f32,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("CONV_{valid_idx}_{test_idx}_roc.csv"));
    let mut w = commented_writer(&path, &format!("auc={auc:.6}"))?;

    w.write_record(["class", "fpr", "tpr", "threshold"])?;
    for (class, curve) in curves {
        for ((fpr, tpr), threshold) in curve.fpr.iter().zip(&curve.tpr).zip(&curve.thresholds) {
            w.write_record([
                class.to_string(),
                format!("{fpr:.6}"),
                format!("{tpr:.6}"),
                threshold.to_string(),
            ])?;
        }
    }
    w.flush()?;

    debug!("Wrote ROC curve '{}'", path.display());
    Ok(path)
}
