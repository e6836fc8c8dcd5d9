//! Sequential mini-batch slicing
//!
//! The training partition is walked in order with no shuffling. Each step
//! takes `end = min(cursor + batch_size, N)`; reaching `N` wraps the cursor to
//! zero and marks the step as an epoch boundary. A size that is not a
//! multiple of the batch size yields one short batch per epoch.

use crate::error::{Error, Result};
use std::ops::Range;

/// End index of the batch starting at `idx`, clamped to `input_size`.
///
/// An offset equal to `input_size` restarts at zero.
pub fn last_batch_index(input_size: usize, idx: usize, batch_size: usize) -> usize {
    let idx = if idx == input_size { 0 } else { idx };
    (idx + batch_size).min(input_size)
}

/// A half-open row range of the training partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: usize,
    pub end: usize,
    /// This batch reached the end of the partition; the cursor wrapped.
    pub epoch_boundary: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Cursor over the training partition, counting completed epochs.
#[derive(Debug, Clone)]
pub struct BatchCursor {
    size: usize,
    batch_size: usize,
    idx: usize,
    epochs: usize,
}

impl BatchCursor {
    pub fn new(size: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
        }
        if size == 0 {
            return Err(Error::InvalidShape("cannot batch an empty partition".to_string()));
        }
        Ok(Self {
            size,
            batch_size,
            idx: 0,
            epochs: 0,
        })
    }

    /// Take the next batch and advance the cursor.
    pub fn next_batch(&mut self) -> Batch {
        let start = self.idx;
        let end = last_batch_index(self.size, start, self.batch_size);
        let epoch_boundary = end == self.size;
        if epoch_boundary {
            self.epochs += 1;
            self.idx = 0;
        } else {
            self.idx = end;
        }
        Batch {
            start,
            end,
            epoch_boundary,
        }
    }

    /// Offset of the next batch.
    pub fn position(&self) -> usize {
        self.idx
    }

    /// Completed passes over the partition.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn reset(&mut self) {
        self.idx = 0;
        self.epochs = 0;
    }
}

/// Consecutive batch ranges covering `0..size`, for evaluation passes.
pub fn eval_batches(size: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = batch_size.max(1);
    (0..size)
        .step_by(step)
        .map(move |start| start..last_batch_index(size, start, step))
}
