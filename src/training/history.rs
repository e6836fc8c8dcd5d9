//! Per-iteration training curves

use serde::{Deserialize, Serialize};

/// Training and validation loss/accuracy, one entry per iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_cost: Vec<f32>,
    pub train_acc: Vec<f32>,
    pub validation_cost: Vec<f32>,
    pub validation_acc: Vec<f32>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, train_cost: f32, train_acc: f32, validation_cost: f32, validation_acc: f32) {
        self.train_cost.push(train_cost);
        self.train_acc.push(train_acc);
        self.validation_cost.push(validation_cost);
        self.validation_acc.push(validation_acc);
    }

    pub fn len(&self) -> usize {
        self.train_cost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_cost.is_empty()
    }

    pub fn reset(&mut self) {
        self.train_cost.clear();
        self.train_acc.clear();
        self.validation_cost.clear();
        self.validation_acc.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let mut history = TrainingHistory::new();
        history.record(0.7, 0.5, 0.69, 0.55);
        history.record(0.6, 0.6, 0.65, 0.6);

        assert_eq!(history.len(), 2);
        assert_eq!(history.validation_acc, vec![0.55, 0.6]);

        history.reset();
        assert!(history.is_empty());
        assert!(history.validation_cost.is_empty());
    }
}
