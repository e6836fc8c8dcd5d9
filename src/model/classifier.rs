//! The trainable classifier: network, composite loss and Adam optimizer

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::layers::Mode;
use crate::model::convnet::ConvNet;
use crate::model::loss::{cross_entropy_delta, softmax_cross_entropy};
use crate::optimizers::{Adam, Optimizer};
use crate::training::{EvalBatch, Network, Snapshot, StepResult};
use tracing::{debug, info};

const ADAM_EPSILON: f32 = 1e-8;

/// Convolutional classifier trained with Adam on
/// `mean cross-entropy + l2_reg × Σ‖θ‖² / 2`.
///
/// # Example
///
/// ```no_run
/// use conv_classifier::config::load_config;
/// use conv_classifier::model::ConvClassifier;
///
/// let config = load_config("config/conv_classifier.json").unwrap();
/// let classifier = ConvClassifier::new(&config).unwrap();
/// println!("{} parameters", classifier.net().parameter_count());
/// ```
#[derive(Debug, Clone)]
pub struct ConvClassifier {
    config: ClassifierConfig,
    net: ConvNet,
    optimizer: Adam,
}

impl ConvClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let net = ConvNet::new(config);

        for line in net.describe() {
            debug!("{line}");
        }
        info!(
            parameters = net.parameter_count(),
            memory_fraction = config.memory_fraction,
            "Built classifier"
        );

        Ok(Self {
            config: config.clone(),
            net,
            optimizer: Self::optimizer_for(config),
        })
    }

    fn optimizer_for(config: &ClassifierConfig) -> Adam {
        Adam::new(config.learning_rate, config.beta1, config.beta2, ADAM_EPSILON)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn net(&self) -> &ConvNet {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut ConvNet {
        &mut self.net
    }

    /// `l2_reg × Σ‖θ‖² / 2` over all trainable parameters.
    pub fn l2_penalty(&self) -> f32 {
        if self.config.l2_reg == 0.0 {
            return 0.0;
        }
        self.config.l2_reg * self.net.squared_norm() / 2.0
    }

    /// Loss on one batch without touching any gradient.
    pub fn batch_loss(&mut self, features: &[f32], labels: &[f32], rows: usize, mode: Mode) -> f32 {
        let logits = self.net.forward(features, rows, mode);
        let xent = softmax_cross_entropy(&logits, labels, rows, self.net.num_classes());
        xent.mean_loss + self.l2_penalty()
    }

    /// Forward and backward pass in `Mode::Train`, leaving the gradient of
    /// the full loss (L2 term included) in every parameter.
    ///
    /// Returns the loss and the predicted classes, both from the parameters
    /// before any update.
    pub fn compute_gradients(&mut self, features: &[f32], labels: &[f32], rows: usize) -> StepResult {
        for param in self.net.parameters_mut() {
            param.zero_grad();
        }

        let logits = self.net.forward(features, rows, Mode::Train);
        let classes = self.net.num_classes();
        let xent = softmax_cross_entropy(&logits, labels, rows, classes);
        let loss = xent.mean_loss + self.l2_penalty();

        let delta = cross_entropy_delta(&xent.probs, labels, rows, classes);
        self.net.backward(&delta);

        let l2_reg = self.config.l2_reg;
        if l2_reg != 0.0 {
            for param in self.net.parameters_mut() {
                for (g, &v) in param.grad.iter_mut().zip(&param.value) {
                    *g += l2_reg * v;
                }
            }
        }

        StepResult {
            loss,
            predictions: xent.predictions,
        }
    }
}

impl Network for ConvClassifier {
    fn train_batch(&mut self, features: &[f32], labels: &[f32], rows: usize) -> StepResult {
        let result = self.compute_gradients(features, labels, rows);
        let mut params = self.net.parameters_mut();
        self.optimizer.step(&mut params);
        result
    }

    fn eval_batch(&mut self, features: &[f32], labels: &[f32], rows: usize) -> EvalBatch {
        let logits = self.net.forward(features, rows, Mode::Eval);
        let xent = softmax_cross_entropy(&logits, labels, rows, self.net.num_classes());
        EvalBatch {
            loss: xent.mean_loss + self.l2_penalty(),
            predictions: xent.predictions,
            logits,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.net.state())
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.net.load_state(snapshot.tensors())
    }

    fn input_size(&self) -> usize {
        self.net.input_size()
    }

    fn num_classes(&self) -> usize {
        self.net.num_classes()
    }

    fn describe(&self) -> Vec<String> {
        self.net.describe()
    }

    fn reset(&mut self) {
        self.net = ConvNet::new(&self.config);
        self.optimizer = Self::optimizer_for(&self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(l2_reg: f32) -> ClassifierConfig {
        let mut config = ClassifierConfig::from_json_str(
            r#"{
                "batch_size": 4,
                "require_improvement": 5,
                "seed": 17,
                "num_iterations": 10,
                "input_channels": 1,
                "input_height": 4,
                "input_width": 4,
                "num_classes": 2,
                "filter_sizes": [3, 3],
                "num_filters": [2, 2],
                "fc_size": 4,
                "feature_dim": 3,
                "hidden_dim": 4
            }"#,
        )
        .unwrap();
        config.l2_reg = l2_reg;
        config
    }

    fn batch() -> (Vec<f32>, Vec<f32>) {
        let features: Vec<f32> = (0..32).map(|v| ((v * 7 % 11) as f32) / 11.0).collect();
        let labels = vec![1.0, 0.0, 0.0, 1.0];
        (features, labels)
    }

    #[test]
    fn test_l2_penalty_is_added_to_loss() {
        let (features, labels) = batch();
        let mut plain = ConvClassifier::new(&config(0.0)).unwrap();
        let mut regularised = ConvClassifier::new(&config(0.1)).unwrap();

        let base = plain.batch_loss(&features, &labels, 2, Mode::Eval);
        let with_l2 = regularised.batch_loss(&features, &labels, 2, Mode::Eval);
        let expected = 0.1 * plain.net().squared_norm() / 2.0;

        assert_relative_eq!(with_l2 - base, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_train_batch_changes_parameters() {
        let (features, labels) = batch();
        let mut classifier = ConvClassifier::new(&config(0.0)).unwrap();
        let before = classifier.snapshot();

        let result = classifier.train_batch(&features, &labels, 2);

        assert_eq!(result.predictions.len(), 2);
        assert!(result.loss.is_finite());
        assert_ne!(classifier.snapshot(), before);
    }

    #[test]
    fn test_reset_restores_initial_weights() {
        let (features, labels) = batch();
        let mut classifier = ConvClassifier::new(&config(0.0)).unwrap();
        let initial = classifier.snapshot();

        classifier.train_batch(&features, &labels, 2);
        classifier.reset();

        assert_eq!(classifier.snapshot(), initial);
    }

    #[test]
    fn test_snapshot_restore() {
        let (features, labels) = batch();
        let mut classifier = ConvClassifier::new(&config(0.0)).unwrap();
        let saved = classifier.snapshot();
        let eval_before = classifier.eval_batch(&features, &labels, 2);

        classifier.train_batch(&features, &labels, 2);
        classifier.restore(&saved).unwrap();
        let eval_after = classifier.eval_batch(&features, &labels, 2);

        assert_eq!(eval_before.logits, eval_after.logits);
    }
}
