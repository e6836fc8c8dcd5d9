//! Convolutional classifier with validation-based early stopping
//!
//! A small hand-written neural-network library (layers, Adam, seeded
//! initialisation) and the training controller built on it: sequential
//! mini-batches, a validation pass after every step, best-model
//! checkpointing, patience-based early stopping and test reporting
//! (accuracy, ROC-AUC, F1).
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Dense, Conv2D, MaxPool, BatchNorm, Dropout)
//! - `optimizers`: Optimizer trait and Adam
//! - `utils`: RNG and activation helpers
//! - `model`: the convolutional classifier and its loss
//! - `training`: the training controller, early stopping and checkpoints
//! - `batching`, `data`: mini-batch slicing and dataset splits
//! - `metrics`, `report`: evaluation metrics and CSV export
//! - `config`, `error`, `logging`: configuration, error type and tracing setup

pub mod batching;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod optimizers;
pub mod report;
pub mod training;
pub mod utils;

pub use config::{load_config, ClassifierConfig};
pub use data::{load_dataset, Dataset, Split};
pub use error::{Error, Result};
pub use model::ConvClassifier;
pub use training::{TestReport, TrainOutcome, Trainer, TrainingSchedule};
