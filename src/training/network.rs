//! The seam between the training controller and a trainable model

use crate::error::Result;
use crate::training::Snapshot;

/// Output of one optimisation step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Batch loss before the update
    pub loss: f32,
    /// Predicted class per row
    pub predictions: Vec<usize>,
}

/// Output of one evaluation batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalBatch {
    pub loss: f32,
    pub predictions: Vec<usize>,
    /// Row-major `rows × num_classes` scores
    pub logits: Vec<f32>,
}

/// A model the [`Trainer`](crate::training::Trainer) can drive.
///
/// Features and labels are row-major slices of `rows` samples; labels are
/// one-hot.
pub trait Network {
    /// Forward and backward pass in training mode followed by one optimizer step.
    fn train_batch(&mut self, features: &[f32], labels: &[f32], rows: usize) -> StepResult;

    /// Forward pass in evaluation mode. Must not change any parameter.
    fn eval_batch(&mut self, features: &[f32], labels: &[f32], rows: usize) -> EvalBatch;

    /// Copy of every tensor needed to restore the current state.
    fn snapshot(&self) -> Snapshot;

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Features per input row.
    fn input_size(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Human-readable layer summary, one line per stage.
    fn describe(&self) -> Vec<String> {
        Vec::new()
    }

    /// Re-initialise parameters and optimizer state.
    fn reset(&mut self);
}
