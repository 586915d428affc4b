//! Integration tests for kernel-boundary validation.
//!
//! Every kernel must reject malformed buffers with a [`ValidationError`] and
//! leave its outputs untouched.

use ruvector_sparse_embed::accumulator::SparseGradAccumulator;
use ruvector_sparse_embed::error::ValidationError;
use ruvector_sparse_embed::lookup::{accumulate_gradients, apply_gradients_direct, lookup_forward};
use ruvector_sparse_embed::min_occ::resolve_min_occ;
use ruvector_sparse_embed::pooling::{segment_broadcast, segment_sum};
use ruvector_sparse_embed::positional::positional_transform;
use ruvector_sparse_embed::tfidf::add_tfidf;
use ruvector_sparse_embed::types::{lengths_from_f32, IndexBatch, Shape};

const SENTINEL: f32 = -7.0;

// ---------------------------------------------------------------------------
// Index stream violations
// ---------------------------------------------------------------------------

#[test]
fn test_reject_zero_index() {
    let table = vec![1.0f32; 6];
    let mut out = vec![SENTINEL; 4];
    let idx = [1.0f32, 0.0];

    let err = lookup_forward(&IndexBatch::bare(&idx), &table, 2, &mut out).unwrap_err();
    assert!(
        matches!(err, ValidationError::InvalidIndex { position: 1, .. }),
        "expected InvalidIndex for index 0, got {:?}",
        err
    );
    assert!(out.iter().all(|&v| v == SENTINEL), "output must be untouched");
}

#[test]
fn test_reject_index_past_table() {
    let mut table = vec![0.0f32; 6];
    let idx = [4.0f32];
    let err = apply_gradients_direct(&IndexBatch::bare(&idx), &[1.0, 1.0], 0.1, &mut table, 2)
        .unwrap_err();
    assert!(
        matches!(err, ValidationError::IndexOutOfBounds { index: 4, vocab: 3, .. }),
        "expected IndexOutOfBounds, got {:?}",
        err
    );
    assert!(table.iter().all(|&v| v == 0.0));
}

#[test]
fn test_reject_nan_weight() {
    let mut acc = SparseGradAccumulator::new(4, 1).unwrap();
    let pairs = [1.0f32, f32::NAN];
    let err =
        accumulate_gradients(&IndexBatch::pairs(&pairs).unwrap(), &[1.0], 1.0, &mut acc).unwrap_err();
    assert!(matches!(err, ValidationError::NonFiniteValue(_)));
    assert!(acc.is_empty(), "no slot may be claimed on validation failure");
}

#[test]
fn test_reject_infinite_scale() {
    let mut acc = SparseGradAccumulator::new(4, 1).unwrap();
    let idx = [1.0f32];
    let err = accumulate_gradients(&IndexBatch::bare(&idx), &[1.0], f32::INFINITY, &mut acc)
        .unwrap_err();
    assert!(matches!(err, ValidationError::NonFiniteValue(_)));
}

// ---------------------------------------------------------------------------
// Ragged batch violations
// ---------------------------------------------------------------------------

#[test]
fn test_reject_dimension_mismatch() {
    // Lengths sum to 3 positions of width 2, but the buffer has 5 elements.
    let data = vec![1.0f64; 5];
    let mut out = vec![0.0f64; 4];
    let err = segment_sum(&data, &[1, 2], 2, &mut out).unwrap_err();
    assert!(
        matches!(err, ValidationError::DimensionMismatch(_)),
        "expected DimensionMismatch, got {:?}",
        err
    );

    // Pooled gradient has the wrong example count.
    let mut grad_in = vec![0.0f32; 6];
    let err = segment_broadcast(&[1.0f32; 2], &[1, 2], 2, &mut grad_in).unwrap_err();
    assert!(matches!(err, ValidationError::DimensionMismatch(_)));
}

#[test]
fn test_reject_empty_positional_segment() {
    let mut result = vec![SENTINEL; 4];
    let err = positional_transform(&[1.0; 4], &[2, 0], 2, &mut result).unwrap_err();
    assert_eq!(err, ValidationError::EmptySegment { example: 1 });
    assert!(result.iter().all(|&v| v == SENTINEL));
}

#[test]
fn test_reject_fractional_float_lengths() {
    let err = lengths_from_f32(&[2.0, 1.25]).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidLength { example: 1, .. }));
}

// ---------------------------------------------------------------------------
// Frequency table violations
// ---------------------------------------------------------------------------

#[test]
fn test_reject_short_frequency_table() {
    let mut out = vec![SENTINEL; 4];
    let err = add_tfidf(&[1.0, 5.0], &[1.0, 1.0], 1.0, &mut out).unwrap_err();
    assert!(matches!(err, ValidationError::IndexOutOfBounds { index: 5, .. }));
    assert!(out.iter().all(|&v| v == SENTINEL));

    let shape = Shape::new(vec![2, 1]).unwrap();
    let mut x = [1.0f32, 5.0];
    let err = resolve_min_occ(&shape, &mut x, &[1.0, 1.0], 2.0).unwrap_err();
    assert!(matches!(err, ValidationError::IndexOutOfBounds { .. }));
    assert_eq!(x, [1.0, 5.0], "no rewrite on validation failure");
}
