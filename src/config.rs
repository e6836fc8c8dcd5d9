//! Configuration structures for the classifier and its training run
//!
//! A single JSON document carries the model hyperparameters and the
//! training-loop settings. Fields with sensible defaults may be omitted.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_learning_rate() -> f32 {
    1e-3
}

fn default_beta1() -> f32 {
    0.9
}

fn default_beta2() -> f32 {
    0.999
}

fn default_keep_prob() -> f32 {
    1.0
}

fn default_memory_fraction() -> f32 {
    1.0
}

fn default_hidden_dim() -> usize {
    500
}

/// Hyperparameters for the convolutional classifier and its training loop.
///
/// # Example
///
/// ```json
/// {
///   "batch_size": 64,
///   "require_improvement": 1000,
///   "seed": 31415,
///   "num_iterations": 40000,
///   "input_channels": 32,
///   "input_height": 16,
///   "input_width": 16,
///   "num_classes": 2,
///   "batch_norm": true,
///   "keep_prob": 0.8,
///   "l2_reg": 0.001,
///   "filter_sizes": [3, 3],
///   "num_filters": [16, 36],
///   "fc_size": 128,
///   "feature_dim": 64,
///   "ratio_observation": 0.3
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Rows per training and evaluation batch
    pub batch_size: usize,

    /// Adam step size
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Adam first-moment decay
    #[serde(default = "default_beta1")]
    pub beta1: f32,

    /// Adam second-moment decay
    #[serde(default = "default_beta2")]
    pub beta2: f32,

    /// Patience: iterations allowed without a validation improvement
    pub require_improvement: usize,

    /// Seed for weight initialisation and dropout masks
    pub seed: u64,

    /// Hard cap on training iterations
    pub num_iterations: usize,

    pub input_channels: usize,
    pub input_height: usize,
    pub input_width: usize,

    pub num_classes: usize,

    /// Insert batch normalisation in the hidden MLP blocks
    #[serde(default)]
    pub batch_norm: bool,

    /// Dropout keep probability for the hidden MLP blocks (1.0 disables dropout)
    #[serde(default = "default_keep_prob")]
    pub keep_prob: f32,

    /// Share of the compute device reserved for the run
    #[serde(default = "default_memory_fraction")]
    pub memory_fraction: f32,

    /// Coefficient of the L2 penalty over all trainable parameters
    #[serde(default)]
    pub l2_reg: f32,

    /// Kernel sizes of the two convolution stages
    pub filter_sizes: [usize; 2],

    /// Output channels of the two convolution stages
    pub num_filters: [usize; 2],

    /// Width of the first fully-connected layer
    pub fc_size: usize,

    /// Width of the feature vector fed to the MLP classifier
    pub feature_dim: usize,

    /// Width of both hidden MLP layers
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,

    /// Fold indices, used to name exported curves
    #[serde(default)]
    pub valid_idx: usize,
    #[serde(default)]
    pub test_idx: usize,

    /// Static class weighting `[r, 1 - r]` applied to the output scores
    #[serde(default)]
    pub ratio_observation: Option<f32>,

    /// Directory for the checkpoint, event stream and exported curves.
    /// Defaults to `<cwd>/summaries`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl ClassifierConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: ClassifierConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of features per sample (`channels × height × width`).
    pub fn input_dim(&self) -> usize {
        self.input_channels * self.input_height * self.input_width
    }

    /// Dropout probability derived from `keep_prob`.
    pub fn drop_rate(&self) -> f32 {
        1.0 - self.keep_prob
    }

    /// Per-class multipliers applied to the output scores.
    ///
    /// `[r, 1 - r]` when `ratio_observation` is set, all ones otherwise.
    pub fn class_weights(&self) -> Vec<f32> {
        match self.ratio_observation {
            Some(ratio) => vec![ratio, 1.0 - ratio],
            None => vec![1.0; self.num_classes],
        }
    }

    /// Resolve the output directory, falling back to `<cwd>/summaries`.
    pub fn resolved_output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("summaries")),
        }
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch_size", self.batch_size),
            ("num_iterations", self.num_iterations),
            ("input_channels", self.input_channels),
            ("input_height", self.input_height),
            ("input_width", self.input_width),
            ("filter_sizes[0]", self.filter_sizes[0]),
            ("filter_sizes[1]", self.filter_sizes[1]),
            ("num_filters[0]", self.num_filters[0]),
            ("num_filters[1]", self.num_filters[1]),
            ("fc_size", self.fc_size),
            ("feature_dim", self.feature_dim),
            ("hidden_dim", self.hidden_dim),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }

        if self.num_classes < 2 {
            return Err(Error::InvalidConfig(
                "num_classes must be at least 2".to_string(),
            ));
        }

        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(
                "learning_rate must be positive".to_string(),
            ));
        }

        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in range [0.0, 1.0)"
                )));
            }
        }

        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            return Err(Error::InvalidConfig(
                "keep_prob must be in range (0.0, 1.0]".to_string(),
            ));
        }

        if !(self.memory_fraction > 0.0 && self.memory_fraction <= 1.0) {
            return Err(Error::InvalidConfig(
                "memory_fraction must be in range (0.0, 1.0]".to_string(),
            ));
        }

        if !(self.l2_reg >= 0.0) {
            return Err(Error::InvalidConfig(
                "l2_reg must be non-negative".to_string(),
            ));
        }

        if let Some(ratio) = self.ratio_observation {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(Error::InvalidConfig(
                    "ratio_observation must be in range [0.0, 1.0]".to_string(),
                ));
            }
            if self.num_classes != 2 {
                return Err(Error::InvalidConfig(format!(
                    "ratio_observation requires num_classes == 2, got {}",
                    self.num_classes
                )));
            }
        }

        Ok(())
    }
}

/// Loads a classifier configuration from a JSON file.
///
/// # Returns
///
/// `Ok(ClassifierConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use conv_classifier::config::load_config;
///
/// let cfg = load_config("config/conv_classifier.json").unwrap();
/// assert_eq!(cfg.num_classes, 2);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ClassifierConfig> {
    let contents = fs::read_to_string(path)?;
    ClassifierConfig::from_json_str(&contents)
}
