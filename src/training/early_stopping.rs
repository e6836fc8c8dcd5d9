//! Validation-accuracy improvement tracking with a patience window.
//!
//! Improvements are strict: an accuracy equal to the best so far does not
//! count. The best accuracy starts at zero, so a run whose validation accuracy
//! never rises above zero never records an improvement.
//!
//! # Example
//!
//! ```
//! use conv_classifier::training::ImprovementTracker;
//!
//! let mut tracker = ImprovementTracker::new(2);
//! assert!(tracker.observe(0, 0.5));
//! assert!(!tracker.observe(1, 0.5));
//! assert!(!tracker.should_stop(2));
//! assert!(tracker.should_stop(3));
//! ```

/// Best validation accuracy and the iteration that produced it.
#[derive(Debug, Clone)]
pub struct ImprovementTracker {
    /// Iterations allowed since the last improvement.
    patience: usize,
    best_accuracy: f32,
    last_improvement: usize,
}

impl ImprovementTracker {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_accuracy: 0.0,
            last_improvement: 0,
        }
    }

    /// Record the validation accuracy at `step`. Returns `true` when it
    /// strictly exceeds every accuracy seen so far.
    pub fn observe(&mut self, step: usize, accuracy: f32) -> bool {
        if accuracy > self.best_accuracy {
            self.best_accuracy = accuracy;
            self.last_improvement = step;
            true
        } else {
            false
        }
    }

    /// `step - last_improvement > patience`
    pub fn should_stop(&self, step: usize) -> bool {
        step.saturating_sub(self.last_improvement) > self.patience
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    pub fn best_accuracy(&self) -> f32 {
        self.best_accuracy
    }

    pub fn last_improvement(&self) -> usize {
        self.last_improvement
    }

    pub fn reset(&mut self) {
        self.best_accuracy = 0.0;
        self.last_improvement = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_accuracy_is_not_an_improvement() {
        let mut tracker = ImprovementTracker::new(5);
        assert!(!tracker.observe(0, 0.0));
        assert_eq!(tracker.last_improvement(), 0);
    }

    #[test]
    fn test_patience_counts_from_last_improvement() {
        let mut tracker = ImprovementTracker::new(3);
        tracker.observe(4, 0.8);

        assert!(!tracker.should_stop(7));
        assert!(tracker.should_stop(8));
    }

    #[test]
    fn test_reset() {
        let mut tracker = ImprovementTracker::new(1);
        tracker.observe(3, 0.9);
        tracker.reset();

        assert_eq!(tracker.best_accuracy(), 0.0);
        assert_eq!(tracker.last_improvement(), 0);
    }
}
