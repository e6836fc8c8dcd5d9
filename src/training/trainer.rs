//! Training/evaluation controller
//!
//! Walks the training partition in sequential mini-batches, evaluates the
//! whole validation partition after every step, keeps the best checkpoint and
//! stops once validation accuracy has not improved for longer than the
//! configured patience.

use crate::batching::{eval_batches, BatchCursor};
use crate::config::ClassifierConfig;
use crate::data::{Dataset, Split};
use crate::error::{Error, Result};
use crate::metrics::{cls_accuracy, correct_predictions, f1_score, log_test_accuracy, roc_from_logits};
use crate::report::{write_roc, write_training_curves};
use crate::training::{CheckpointStore, ImprovementTracker, Network, SummaryWriter, TrainingHistory};
use crate::utils::argmax_rows;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Loop settings taken from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSchedule {
    pub batch_size: usize,
    pub num_iterations: usize,
    /// Patience, in iterations
    pub require_improvement: usize,
    pub valid_idx: usize,
    pub test_idx: usize,
    pub output_dir: PathBuf,
}

impl TrainingSchedule {
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            batch_size: config.batch_size,
            num_iterations: config.num_iterations,
            require_improvement: config.require_improvement,
            valid_idx: config.valid_idx,
            test_idx: config.test_idx,
            output_dir: config.resolved_output_dir()?,
        })
    }
}

/// Why the training loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Patience exhausted at this iteration
    NoImprovement { step: usize },
    /// All configured iterations ran
    IterationBudget,
}

/// Summary of a finished training loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    /// Iteration of the last validation improvement (0 if none)
    pub last_improvement: usize,
    /// Completed passes over the training partition
    pub epochs: usize,
    pub steps_run: usize,
    /// Iterations at which a checkpoint was written
    pub checkpoint_steps: Vec<usize>,
    pub best_validation_accuracy: f32,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

/// Batched evaluation of one split.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub correct: Vec<bool>,
    pub predicted: Vec<usize>,
    /// Row-major `rows × num_classes`
    pub logits: Vec<f32>,
    /// Sum of per-batch losses divided by `rows / batch_size`
    pub loss: f32,
}

/// Final test metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub accuracy: f32,
    pub auc: f32,
    pub f1: f32,
    pub loss: f32,
    pub last_improvement: usize,
    pub epochs: usize,
    /// Whether the scored parameters came from the best checkpoint; `false`
    /// means no checkpoint was saved and the final parameters were used
    pub restored: bool,
}

/// Evaluate `split` in batches of `batch_size`.
///
/// The loss is averaged over `rows / batch_size` computed in floating point,
/// so a short final batch weighs as much as a full one.
pub fn predict_split<N: Network + ?Sized>(network: &mut N, split: &Split, batch_size: usize) -> Prediction {
    let rows = split.rows();
    let mut predicted = Vec::with_capacity(rows);
    let mut logits = Vec::with_capacity(rows * split.num_classes());
    let mut total_loss = 0.0f32;

    for range in eval_batches(rows, batch_size) {
        let batch = network.eval_batch(
            split.feature_rows(range.clone()),
            split.label_rows(range.clone()),
            range.len(),
        );
        total_loss += batch.loss;
        predicted.extend(batch.predictions);
        logits.extend(batch.logits);
    }

    let num_batches = rows as f32 / batch_size.max(1) as f32;
    let loss = if rows == 0 { 0.0 } else { total_loss / num_batches };
    let correct = correct_predictions(&predicted, &split.classes());

    Prediction {
        correct,
        predicted,
        logits,
        loss,
    }
}

/// `H:MM:SS`, rounded to the nearest second.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().round() as u64;
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Owns a network, its data and the state of one training session.
pub struct Trainer<N: Network> {
    network: N,
    data: Dataset,
    schedule: TrainingSchedule,
    history: TrainingHistory,
    checkpoints: CheckpointStore,
    saved_checkpoint: bool,
}

impl<N: Network> Trainer<N> {
    pub fn new(network: N, data: Dataset, schedule: TrainingSchedule) -> Result<Self> {
        if network.num_classes() != data.num_classes() {
            return Err(Error::InvalidShape(format!(
                "network predicts {} classes but labels have {}",
                network.num_classes(),
                data.num_classes()
            )));
        }
        if network.input_size() != data.input_dim() {
            return Err(Error::InvalidShape(format!(
                "network expects {} features per row but the data has {}",
                network.input_size(),
                data.input_dim()
            )));
        }
        let checkpoints = CheckpointStore::new(&schedule.output_dir)?;

        Ok(Self {
            network,
            data,
            schedule,
            history: TrainingHistory::new(),
            checkpoints,
            saved_checkpoint: false,
        })
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn schedule(&self) -> &TrainingSchedule {
        &self.schedule
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Clear the session state and re-initialise the network.
    pub fn reset(&mut self) {
        self.history.reset();
        self.saved_checkpoint = false;
        self.network.reset();
    }

    /// Hand back the network and the recorded curves.
    pub fn finish(self) -> (N, TrainingHistory) {
        (self.network, self.history)
    }

    /// Run the training loop until patience or the iteration budget runs out.
    pub fn train(&mut self) -> Result<TrainOutcome> {
        let schedule = self.schedule.clone();
        info!(
            "Training CONV: valid_idx:{}, test_idx:{}, batch_size:{}, num_iterations:{}, require_improvement:{}",
            schedule.valid_idx,
            schedule.test_idx,
            schedule.batch_size,
            schedule.num_iterations,
            schedule.require_improvement
        );
        for line in self.network.describe() {
            debug!("{line}");
        }

        self.history.reset();
        self.saved_checkpoint = false;

        let train = &self.data.train;
        let classes = self.data.num_classes();
        let mut cursor = BatchCursor::new(train.rows(), schedule.batch_size)?;
        let mut tracker = ImprovementTracker::new(schedule.require_improvement);
        let mut summary = SummaryWriter::create(&schedule.output_dir)?;

        let start = Instant::now();
        let mut checkpoint_steps = Vec::new();
        let mut steps_run = 0;
        let mut stop_reason = StopReason::IterationBudget;

        for i in 0..schedule.num_iterations {
            let batch = cursor.next_batch();
            let labels = train.label_rows(batch.range());
            let step = self
                .network
                .train_batch(train.feature_rows(batch.range()), labels, batch.len());

            let truth = argmax_rows(labels, batch.len(), classes);
            let (train_acc, _) = cls_accuracy(&correct_predictions(&step.predictions, &truth));
            summary.add_scalar("cost", i, step.loss)?;

            let valid = predict_split(&mut self.network, &self.data.valid, schedule.batch_size);
            let (valid_acc, _) = cls_accuracy(&valid.correct);
            self.history.record(step.loss, train_acc, valid.loss, valid_acc);
            steps_run = i + 1;

            if batch.epoch_boundary || i == schedule.num_iterations - 1 {
                let improved = tracker.observe(i, valid_acc);
                if improved {
                    self.checkpoints.save(&self.network.snapshot())?;
                    self.saved_checkpoint = true;
                    checkpoint_steps.push(i);
                }
                info!(
                    "Epoch: {}, Training Loss: {:.6}, Acc: {:.4}, Validation Loss: {:.6}, Acc: {:.4} {}",
                    cursor.epochs(),
                    step.loss,
                    train_acc,
                    valid.loss,
                    valid_acc,
                    if improved { "*" } else { "" }
                );
            }

            if tracker.should_stop(i) {
                info!("No improvement found in a while, stopping optimization.");
                stop_reason = StopReason::NoImprovement { step: i };
                break;
            }
        }
        summary.flush()?;

        let elapsed = start.elapsed();
        info!("Time usage: {}", format_elapsed(elapsed));

        Ok(TrainOutcome {
            last_improvement: tracker.last_improvement(),
            epochs: cursor.epochs(),
            steps_run,
            checkpoint_steps,
            best_validation_accuracy: tracker.best_accuracy(),
            stop_reason,
            elapsed,
        })
    }

    /// Load the best checkpoint of this session into the network.
    ///
    /// Without one (validation accuracy never rose above zero) the current
    /// parameters are kept and a warning is logged.
    pub fn restore_best(&mut self) -> Result<bool> {
        if !self.saved_checkpoint {
            warn!("No checkpoint was saved during training; evaluating the current parameters");
            return Ok(false);
        }
        let snapshot = self.checkpoints.load()?;
        self.network.restore(&snapshot)?;
        Ok(true)
    }

    /// Train, export curves, restore the best checkpoint and score the test split.
    pub fn train_test(&mut self) -> Result<TestReport> {
        let outcome = self.train()?;
        let schedule = &self.schedule;
        write_training_curves(
            &schedule.output_dir,
            &self.history,
            schedule.valid_idx,
            schedule.test_idx,
            outcome.epochs,
            outcome.last_improvement,
        )?;

        let restored = self.restore_best()?;

        let classes = self.data.num_classes();
        let test = predict_split(&mut self.network, &self.data.test, self.schedule.batch_size);
        info!("Test Loss: {}", test.loss);

        let truth = self.data.test.classes();
        let roc = roc_from_logits(&test.logits, &truth, classes);
        write_roc(
            &self.schedule.output_dir,
            self.schedule.valid_idx,
            self.schedule.test_idx,
            &roc.curves,
            roc.auc,
        )?;

        let accuracy = log_test_accuracy(&test.correct, &test.predicted, &truth, classes);
        let f1 = f1_score(&truth, &test.predicted, classes);
        info!("Test AUC: {:.4}, F1: {:.4}", roc.auc, f1);

        Ok(TestReport {
            accuracy,
            auc: roc.auc,
            f1,
            loss: test.loss,
            last_improvement: outcome.last_improvement,
            epochs: outcome.epochs,
            restored,
        })
    }
}
