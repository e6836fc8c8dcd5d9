//! Convolutional feature extractor followed by an MLP classifier
//!
//! ```text
//! input (C×H×W)
//!   → conv1 + ReLU → 2×2 max-pool
//!   → conv2 + ReLU → 2×2 max-pool
//!   → flatten → fc1 + ReLU → fc2 (feature vector)
//!   → [dense + ReLU → batch norm? → dropout] × 2
//!   → output dense → × class weights (logits)
//! ```

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::layers::{
    BatchNormLayer, Conv2DLayer, DenseLayer, DropoutLayer, Layer, MaxPoolLayer, Mode, Param,
};
use crate::utils::{relu_backward_inplace, relu_inplace, SimpleRng};

const POOL_SIZE: usize = 2;
const BN_EPSILON: f32 = 1e-3;
const BN_MOMENTUM: f32 = 0.99;

/// dense → ReLU → optional batch norm → dropout
#[derive(Debug, Clone)]
struct HiddenBlock {
    dense: DenseLayer,
    batch_norm: Option<BatchNormLayer>,
    dropout: DropoutLayer,
    activated: Vec<f32>,
    normalized: Vec<f32>,
    output: Vec<f32>,
}

impl HiddenBlock {
    fn new(
        input_size: usize,
        output_size: usize,
        batch_norm: bool,
        drop_rate: f32,
        rng: &mut SimpleRng,
    ) -> Self {
        let dense = DenseLayer::new(input_size, output_size, rng);
        let batch_norm = batch_norm.then(|| BatchNormLayer::new(output_size, BN_EPSILON, BN_MOMENTUM));
        let dropout = DropoutLayer::new(output_size, drop_rate, rng);
        Self {
            dense,
            batch_norm,
            dropout,
            activated: Vec::new(),
            normalized: Vec::new(),
            output: Vec::new(),
        }
    }

    fn forward(&mut self, input: &[f32], rows: usize, mode: Mode) {
        let width = self.dense.output_size();
        self.activated.resize(rows * width, 0.0);
        self.output.resize(rows * width, 0.0);

        self.dense.forward(input, &mut self.activated, rows, mode);
        relu_inplace(&mut self.activated);

        match self.batch_norm.as_mut() {
            Some(bn) => {
                self.normalized.resize(rows * width, 0.0);
                bn.forward(&self.activated, &mut self.normalized, rows, mode);
                self.dropout.forward(&self.normalized, &mut self.output, rows, mode);
            }
            None => {
                self.dropout.forward(&self.activated, &mut self.output, rows, mode);
            }
        }
    }

    /// Returns the gradient with respect to the block input.
    fn backward(&mut self, input: &[f32], grad_output: &[f32], rows: usize) -> Vec<f32> {
        let width = self.dense.output_size();
        let mut grad = vec![0.0f32; rows * width];
        self.dropout.backward(&self.output, grad_output, &mut grad, rows);

        if let Some(bn) = self.batch_norm.as_mut() {
            let mut grad_bn = vec![0.0f32; rows * width];
            bn.backward(&self.activated, &grad, &mut grad_bn, rows);
            grad = grad_bn;
        }

        relu_backward_inplace(&self.activated, &mut grad);

        let mut grad_input = vec![0.0f32; rows * self.dense.input_size()];
        self.dense.backward(input, &grad, &mut grad_input, rows);
        grad_input
    }

    fn layers(&self) -> Vec<&dyn Layer> {
        let mut layers: Vec<&dyn Layer> = vec![&self.dense as &dyn Layer];
        if let Some(bn) = &self.batch_norm {
            layers.push(bn);
        }
        layers
    }

    fn layers_mut(&mut self) -> Vec<&mut dyn Layer> {
        let mut layers: Vec<&mut dyn Layer> = vec![&mut self.dense as &mut dyn Layer];
        if let Some(bn) = self.batch_norm.as_mut() {
            layers.push(bn);
        }
        layers
    }
}

/// Activations kept from the last forward pass for backpropagation.
#[derive(Debug, Clone, Default)]
struct ForwardCache {
    rows: usize,
    input: Vec<f32>,
    conv1: Vec<f32>,
    pool1: Vec<f32>,
    conv2: Vec<f32>,
    pool2: Vec<f32>,
    fc1: Vec<f32>,
    features: Vec<f32>,
}

/// The fixed-topology classifier network.
///
/// `forward` returns the class-weighted scores (the logits fed to softmax);
/// `backward` takes the gradient of the loss with respect to those logits and
/// accumulates parameter gradients in every layer.
#[derive(Debug, Clone)]
pub struct ConvNet {
    conv1: Conv2DLayer,
    pool1: MaxPoolLayer,
    conv2: Conv2DLayer,
    pool2: MaxPoolLayer,
    fc1: DenseLayer,
    fc2: DenseLayer,
    hidden: [HiddenBlock; 2],
    output: DenseLayer,
    class_weights: Vec<f32>,
    cache: ForwardCache,
}

impl ConvNet {
    /// Build the network from the configuration, initialising every weight
    /// from a generator seeded with `config.seed`.
    pub fn new(config: &ClassifierConfig) -> Self {
        let mut rng = SimpleRng::new(config.seed);

        let conv1 = Conv2DLayer::same(
            config.input_channels,
            config.num_filters[0],
            config.filter_sizes[0],
            config.input_height,
            config.input_width,
            &mut rng,
        );
        let pool1 = MaxPoolLayer::new(
            config.num_filters[0],
            conv1.output_height(),
            conv1.output_width(),
            POOL_SIZE,
        );
        let conv2 = Conv2DLayer::same(
            config.num_filters[0],
            config.num_filters[1],
            config.filter_sizes[1],
            pool1.output_height(),
            pool1.output_width(),
            &mut rng,
        );
        let pool2 = MaxPoolLayer::new(
            config.num_filters[1],
            conv2.output_height(),
            conv2.output_width(),
            POOL_SIZE,
        );

        let num_features = pool2.output_size();
        let fc1 = DenseLayer::new(num_features, config.fc_size, &mut rng);
        let fc2 = DenseLayer::new(config.fc_size, config.feature_dim, &mut rng);

        let drop_rate = config.drop_rate();
        let hidden = [
            HiddenBlock::new(config.feature_dim, config.hidden_dim, config.batch_norm, drop_rate, &mut rng),
            HiddenBlock::new(config.hidden_dim, config.hidden_dim, config.batch_norm, drop_rate, &mut rng),
        ];
        let output = DenseLayer::new(config.hidden_dim, config.num_classes, &mut rng);

        Self {
            conv1,
            pool1,
            conv2,
            pool2,
            fc1,
            fc2,
            hidden,
            output,
            class_weights: config.class_weights(),
            cache: ForwardCache::default(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.conv1.input_size()
    }

    pub fn num_classes(&self) -> usize {
        self.output.output_size()
    }

    /// Width of the flattened convolutional features.
    pub fn num_features(&self) -> usize {
        self.pool2.output_size()
    }

    pub fn class_weights(&self) -> &[f32] {
        &self.class_weights
    }

    /// One line per stage: name and per-sample output shape.
    pub fn describe(&self) -> Vec<String> {
        let hidden_width = self.hidden[0].dense.output_size();
        vec![
            format!(
                "conv1: {}x{}x{} (kernel {})",
                self.conv1.out_channels(),
                self.conv1.output_height(),
                self.conv1.output_width(),
                self.conv1.kernel_size()
            ),
            format!(
                "pool1: {}x{}x{}",
                self.pool1.channels(),
                self.pool1.output_height(),
                self.pool1.output_width()
            ),
            format!(
                "conv2: {}x{}x{} (kernel {})",
                self.conv2.out_channels(),
                self.conv2.output_height(),
                self.conv2.output_width(),
                self.conv2.kernel_size()
            ),
            format!(
                "pool2: {}x{}x{}",
                self.pool2.channels(),
                self.pool2.output_height(),
                self.pool2.output_width()
            ),
            format!("flatten: {}", self.num_features()),
            format!("fc1: {}", self.fc1.output_size()),
            format!("feature_vec: {}", self.fc2.output_size()),
            format!(
                "hidden: 2 x {} (batch_norm: {}, drop_rate: {})",
                hidden_width,
                self.hidden[0].batch_norm.is_some(),
                self.hidden[0].dropout.drop_rate()
            ),
            format!("logits: {} (class weights {:?})", self.num_classes(), self.class_weights),
        ]
    }

    /// Forward pass over `rows` samples, returning the weighted logits.
    pub fn forward(&mut self, input: &[f32], rows: usize, mode: Mode) -> Vec<f32> {
        let cache = &mut self.cache;
        cache.rows = rows;
        cache.input.clear();
        cache.input.extend_from_slice(input);

        cache.conv1.resize(rows * self.conv1.output_size(), 0.0);
        self.conv1.forward(&cache.input, &mut cache.conv1, rows, mode);
        relu_inplace(&mut cache.conv1);
        cache.pool1.resize(rows * self.pool1.output_size(), 0.0);
        self.pool1.forward(&cache.conv1, &mut cache.pool1, rows, mode);

        cache.conv2.resize(rows * self.conv2.output_size(), 0.0);
        self.conv2.forward(&cache.pool1, &mut cache.conv2, rows, mode);
        relu_inplace(&mut cache.conv2);
        cache.pool2.resize(rows * self.pool2.output_size(), 0.0);
        self.pool2.forward(&cache.conv2, &mut cache.pool2, rows, mode);

        cache.fc1.resize(rows * self.fc1.output_size(), 0.0);
        self.fc1.forward(&cache.pool2, &mut cache.fc1, rows, mode);
        relu_inplace(&mut cache.fc1);
        cache.features.resize(rows * self.fc2.output_size(), 0.0);
        self.fc2.forward(&cache.fc1, &mut cache.features, rows, mode);

        let [first, second] = &mut self.hidden;
        first.forward(&cache.features, rows, mode);
        second.forward(&first.output, rows, mode);

        let classes = self.output.output_size();
        let mut logits = vec![0.0f32; rows * classes];
        self.output.forward(&second.output, &mut logits, rows, mode);
        for row in logits.chunks_exact_mut(classes) {
            for (v, &w) in row.iter_mut().zip(&self.class_weights) {
                *v *= w;
            }
        }
        logits
    }

    /// Backward pass from the gradient with respect to the weighted logits of
    /// the last `forward` call.
    pub fn backward(&mut self, grad_logits: &[f32]) {
        let cache = &self.cache;
        let rows = cache.rows;
        let classes = self.output.output_size();
        assert_eq!(grad_logits.len(), rows * classes, "grad_logits length mismatch");

        let mut grad_scores = grad_logits.to_vec();
        for row in grad_scores.chunks_exact_mut(classes) {
            for (g, &w) in row.iter_mut().zip(&self.class_weights) {
                *g *= w;
            }
        }

        let [first, second] = &mut self.hidden;
        let mut grad_h2 = vec![0.0f32; rows * self.output.input_size()];
        self.output.backward(&second.output, &grad_scores, &mut grad_h2, rows);
        let grad_h1 = second.backward(&first.output, &grad_h2, rows);
        let grad_features = first.backward(&cache.features, &grad_h1, rows);

        let mut grad_fc1 = vec![0.0f32; cache.fc1.len()];
        self.fc2.backward(&cache.fc1, &grad_features, &mut grad_fc1, rows);
        relu_backward_inplace(&cache.fc1, &mut grad_fc1);

        let mut grad_pool2 = vec![0.0f32; cache.pool2.len()];
        self.fc1.backward(&cache.pool2, &grad_fc1, &mut grad_pool2, rows);

        let mut grad_conv2 = vec![0.0f32; cache.conv2.len()];
        self.pool2.backward(&cache.conv2, &grad_pool2, &mut grad_conv2, rows);
        relu_backward_inplace(&cache.conv2, &mut grad_conv2);

        let mut grad_pool1 = vec![0.0f32; cache.pool1.len()];
        self.conv2.backward(&cache.pool1, &grad_conv2, &mut grad_pool1, rows);

        let mut grad_conv1 = vec![0.0f32; cache.conv1.len()];
        self.pool1.backward(&cache.conv1, &grad_pool1, &mut grad_conv1, rows);
        relu_backward_inplace(&cache.conv1, &mut grad_conv1);

        let mut grad_input = vec![0.0f32; cache.input.len()];
        self.conv1.backward(&cache.input, &grad_conv1, &mut grad_input, rows);
    }

    fn layers(&self) -> Vec<&dyn Layer> {
        let mut layers: Vec<&dyn Layer> = vec![
            &self.conv1 as &dyn Layer,
            &self.conv2 as &dyn Layer,
            &self.fc1 as &dyn Layer,
            &self.fc2 as &dyn Layer,
        ];
        for block in &self.hidden {
            layers.extend(block.layers());
        }
        layers.push(&self.output);
        layers
    }

    fn layers_mut(&mut self) -> Vec<&mut dyn Layer> {
        let mut layers: Vec<&mut dyn Layer> = vec![
            &mut self.conv1 as &mut dyn Layer,
            &mut self.conv2 as &mut dyn Layer,
            &mut self.fc1 as &mut dyn Layer,
            &mut self.fc2 as &mut dyn Layer,
        ];
        for block in self.hidden.iter_mut() {
            layers.extend(block.layers_mut());
        }
        layers.push(&mut self.output);
        layers
    }

    /// Every trainable parameter, in a fixed order.
    pub fn parameters(&self) -> Vec<&Param> {
        self.layers()
            .into_iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.layers_mut()
            .into_iter()
            .flat_map(|layer| layer.parameters_mut())
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Sum of squared values over all trainable parameters.
    pub fn squared_norm(&self) -> f32 {
        self.parameters().iter().map(|p| p.squared_norm()).sum()
    }

    /// Copies of every tensor a checkpoint needs.
    pub fn state(&self) -> Vec<Vec<f32>> {
        self.layers()
            .into_iter()
            .flat_map(|layer| layer.state())
            .map(|tensor| tensor.to_vec())
            .collect()
    }

    /// Overwrite the network state with tensors produced by [`ConvNet::state`].
    pub fn load_state(&mut self, tensors: &[Vec<f32>]) -> Result<()> {
        let mut targets: Vec<&mut Vec<f32>> = self
            .layers_mut()
            .into_iter()
            .flat_map(|layer| layer.state_mut())
            .collect();

        if targets.len() != tensors.len() {
            return Err(Error::Checkpoint(format!(
                "checkpoint has {} tensors, model expects {}",
                tensors.len(),
                targets.len()
            )));
        }
        for (i, (target, tensor)) in targets.iter().zip(tensors).enumerate() {
            if target.len() != tensor.len() {
                return Err(Error::Checkpoint(format!(
                    "tensor {} has {} values, model expects {}",
                    i,
                    tensor.len(),
                    target.len()
                )));
            }
        }
        for (target, tensor) in targets.iter_mut().zip(tensors) {
            target.copy_from_slice(tensor);
        }
        Ok(())
    }
}
