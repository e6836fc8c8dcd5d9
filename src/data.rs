//! Row-aligned dataset splits
//!
//! Features and one-hot labels are stored row-major as flat `f32` buffers.
//! Feature rows are channel-major (`channels × height × width`).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::ops::Range;
use std::path::Path;

/// One partition of the data: a feature matrix and its one-hot labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    features: Vec<f32>,
    labels: Vec<f32>,
    rows: usize,
    input_dim: usize,
    num_classes: usize,
}

impl Split {
    /// Build a split from flat feature and one-hot label buffers.
    ///
    /// Fails with `Error::InvalidShape` when either buffer is not a whole
    /// number of rows or the row counts disagree.
    pub fn new(
        features: Vec<f32>,
        labels: Vec<f32>,
        input_dim: usize,
        num_classes: usize,
    ) -> Result<Self> {
        if input_dim == 0 || num_classes == 0 {
            return Err(Error::InvalidShape(
                "input_dim and num_classes must be positive".to_string(),
            ));
        }
        if features.len() % input_dim != 0 {
            return Err(Error::InvalidShape(format!(
                "feature buffer of {} values is not a multiple of input_dim {}",
                features.len(),
                input_dim
            )));
        }
        if labels.len() % num_classes != 0 {
            return Err(Error::InvalidShape(format!(
                "label buffer of {} values is not a multiple of num_classes {}",
                labels.len(),
                num_classes
            )));
        }

        let rows = features.len() / input_dim;
        let label_rows = labels.len() / num_classes;
        if rows != label_rows {
            return Err(Error::InvalidShape(format!(
                "{rows} feature rows but {label_rows} label rows"
            )));
        }

        Ok(Self {
            features,
            labels,
            rows,
            input_dim,
            num_classes,
        })
    }

    /// Build a split from class indices, expanding them to one-hot rows.
    pub fn from_class_indices(
        features: Vec<f32>,
        classes: &[usize],
        input_dim: usize,
        num_classes: usize,
    ) -> Result<Self> {
        let mut labels = vec![0.0f32; classes.len() * num_classes];
        for (row, &class) in classes.iter().enumerate() {
            if class >= num_classes {
                return Err(Error::InvalidShape(format!(
                    "label {class} at row {row} is out of range for {num_classes} classes"
                )));
            }
            labels[row * num_classes + class] = 1.0;
        }
        Self::new(features, labels, input_dim, num_classes)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// Feature rows `range.start..range.end`, flattened.
    pub fn feature_rows(&self, range: Range<usize>) -> &[f32] {
        &self.features[range.start * self.input_dim..range.end * self.input_dim]
    }

    /// One-hot label rows `range.start..range.end`, flattened.
    pub fn label_rows(&self, range: Range<usize>) -> &[f32] {
        &self.labels[range.start * self.num_classes..range.end * self.num_classes]
    }

    /// True class index per row (argmax of the one-hot label).
    pub fn classes(&self) -> Vec<usize> {
        crate::utils::argmax_rows(&self.labels, self.rows, self.num_classes)
    }
}

/// The three partitions used by a training run.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Split,
    pub valid: Split,
    pub test: Split,
}

impl Dataset {
    /// Group three splits, checking they share feature and label widths.
    pub fn new(train: Split, valid: Split, test: Split) -> Result<Self> {
        for (name, split) in [("valid", &valid), ("test", &test)] {
            if split.input_dim != train.input_dim || split.num_classes != train.num_classes {
                return Err(Error::InvalidShape(format!(
                    "{name} split is {}x{} but train split is {}x{}",
                    split.input_dim, split.num_classes, train.input_dim, train.num_classes
                )));
            }
        }
        for (name, split) in [("train", &train), ("valid", &valid), ("test", &test)] {
            if split.is_empty() {
                return Err(Error::InvalidShape(format!("{name} split has no rows")));
            }
        }
        Ok(Self { train, valid, test })
    }

    pub fn input_dim(&self) -> usize {
        self.train.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.train.num_classes
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLabels {
    Classes(Vec<usize>),
    OneHot(Vec<Vec<f32>>),
}

#[derive(Debug, Deserialize)]
struct RawSplit {
    features: Vec<Vec<f32>>,
    labels: RawLabels,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    train: RawSplit,
    valid: RawSplit,
    test: RawSplit,
}

fn flatten_rows(rows: Vec<Vec<f32>>, width: usize, what: &str) -> Result<Vec<f32>> {
    let mut flat = Vec::with_capacity(rows.len() * width);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != width {
            return Err(Error::InvalidShape(format!(
                "{what} row {i} has {} values, expected {width}",
                row.len()
            )));
        }
        flat.extend(row);
    }
    Ok(flat)
}

fn convert_split(raw: RawSplit, input_dim: usize, num_classes: usize, name: &str) -> Result<Split> {
    let features = flatten_rows(raw.features, input_dim, &format!("{name} feature"))?;
    match raw.labels {
        RawLabels::Classes(classes) => {
            Split::from_class_indices(features, &classes, input_dim, num_classes)
        }
        RawLabels::OneHot(rows) => {
            let labels = flatten_rows(rows, num_classes, &format!("{name} label"))?;
            Split::new(features, labels, input_dim, num_classes)
        }
    }
}

/// Loads train/valid/test splits from a JSON file.
///
/// ```json
/// {"train": {"features": [[0.1, 0.2], [0.3, 0.4]], "labels": [0, 1]},
///  "valid": {"features": [[0.5, 0.6]], "labels": [[1.0, 0.0]]},
///  "test":  {"features": [[0.7, 0.8]], "labels": [1]}}
/// ```
pub fn load_dataset(path: impl AsRef<Path>, input_dim: usize, num_classes: usize) -> Result<Dataset> {
    let contents = fs::read_to_string(path)?;
    let raw: RawDataset = serde_json::from_str(&contents)?;

    let train = convert_split(raw.train, input_dim, num_classes, "train")?;
    let valid = convert_split(raw.valid, input_dim, num_classes, "valid")?;
    let test = convert_split(raw.test, input_dim, num_classes, "test")?;
    Dataset::new(train, valid, test)
}
