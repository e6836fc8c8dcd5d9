//! Training loop, early stopping and checkpointing
//!
//! - `network`: the trait a trainable model implements
//! - `trainer`: the per-iteration loop and final test evaluation
//! - `early_stopping`: best-accuracy tracking with a patience window
//! - `checkpoint`: the best-model snapshot on disk
//! - `history`, `summary`: per-iteration curves and the scalar event stream

pub mod checkpoint;
pub mod early_stopping;
pub mod history;
pub mod network;
pub mod summary;
pub mod trainer;

pub use checkpoint::{CheckpointStore, Snapshot, CHECKPOINT_FILE};
pub use early_stopping::ImprovementTracker;
pub use history::TrainingHistory;
pub use network::{EvalBatch, Network, StepResult};
pub use summary::{SummaryWriter, EVENTS_FILE};
pub use trainer::{
    format_elapsed, predict_split, Prediction, StopReason, TestReport, TrainOutcome, Trainer,
    TrainingSchedule,
};
