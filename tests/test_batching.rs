//! Tests for sequential mini-batch slicing
//!
//! - Every index is visited exactly once per epoch
//! - The cursor wraps to zero at the end of the partition
//! - The final batch of an epoch is the remainder

use conv_classifier::batching::{eval_batches, BatchCursor};

fn one_epoch(cursor: &mut BatchCursor) -> Vec<(usize, usize)> {
    let mut batches = Vec::new();
    loop {
        let batch = cursor.next_batch();
        batches.push((batch.start, batch.end));
        if batch.epoch_boundary {
            return batches;
        }
    }
}

#[test]
fn test_ten_rows_batch_three() {
    let mut cursor = BatchCursor::new(10, 3).unwrap();

    let ends: Vec<usize> = one_epoch(&mut cursor).iter().map(|&(_, end)| end).collect();
    assert_eq!(ends, vec![3, 6, 9, 10]);
    assert_eq!(cursor.position(), 0);
    assert_eq!(cursor.epochs(), 1);

    let next = cursor.next_batch();
    assert_eq!((next.start, next.end), (0, 3));
    assert!(!next.epoch_boundary);
}

#[test]
fn test_every_index_visited_once_per_epoch() {
    for size in 1..=25 {
        for batch_size in 1..=12 {
            let mut cursor = BatchCursor::new(size, batch_size).unwrap();

            for epoch in 1..=3 {
                let batches = one_epoch(&mut cursor);
                let mut visited = vec![0usize; size];
                for &(start, end) in &batches {
                    for v in &mut visited[start..end] {
                        *v += 1;
                    }
                }
                assert!(
                    visited.iter().all(|&v| v == 1),
                    "size {size}, batch {batch_size}: {visited:?}"
                );

                let (start, end) = batches[batches.len() - 1];
                let expected_last = if size % batch_size == 0 { batch_size.min(size) } else { size % batch_size };
                assert_eq!(end - start, expected_last.min(size));
                assert_eq!(batches[0].0, 0);
                assert_eq!(cursor.position(), 0);
                assert_eq!(cursor.epochs(), epoch);
            }
        }
    }
}

#[test]
fn test_exact_multiple_has_no_short_batch() {
    let mut cursor = BatchCursor::new(12, 4).unwrap();
    let batches = one_epoch(&mut cursor);
    assert_eq!(batches, vec![(0, 4), (4, 8), (8, 12)]);
}

#[test]
fn test_eval_batches_match_training_slices() {
    let ranges: Vec<_> = eval_batches(10, 3).collect();
    assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
}
