//! Ragged segment pooling.
//!
//! [`segment_sum`] reduces each example's run of `dim`-vectors to a single
//! vector by summation; [`segment_broadcast`] is its adjoint, copying each
//! example's gradient to every position of the run.
//!
//! # Layout
//!
//! For `lengths = [l0, l1, ...]` the flat input holds `l0` vectors of example
//! 0, then `l1` vectors of example 1, and so on, with no gaps. The pooled
//! buffer holds one vector per example.
//!
//! # Width dispatch
//!
//! Widths 1 and 2 have dedicated loops that avoid the inner dimension loop;
//! every other width takes the general path. All paths add the elements of a
//! component in position order with an `f64` accumulator, so they produce
//! bit-identical results for the same width.

use crate::error::Result;
use crate::types::{Element, Width};
use crate::validation::{validate_buffer_len, validate_ragged};

// ---------------------------------------------------------------------------
// Forward: sum
// ---------------------------------------------------------------------------

/// Sum each example's run of `dim`-vectors.
///
/// `data` holds `sum(lengths) * dim` elements, `out` holds
/// `lengths.len() * dim`. Dispatches on [`Width::for_dim`].
///
/// # Errors
///
/// Returns [`ValidationError`](crate::error::ValidationError) if either
/// buffer does not match `lengths` and `dim`. Nothing is written on error.
///
/// # Examples
///
/// ```
/// use ruvector_sparse_embed::pooling::segment_sum;
///
/// let data = [1.0f32, 1.0, 2.0, 2.0, 3.0, 3.0];
/// let mut out = [0.0f32; 4];
/// segment_sum(&data, &[2, 1], 2, &mut out).unwrap();
/// assert_eq!(out, [3.0, 3.0, 3.0, 3.0]);
/// ```
pub fn segment_sum<T: Element>(data: &[T], lengths: &[usize], dim: usize, out: &mut [T]) -> Result<()> {
    segment_sum_with(Width::for_dim(dim), data, lengths, out)
}

/// [`segment_sum`] with an explicit code path.
///
/// # Errors
///
/// Same conditions as [`segment_sum`], with `dim = width.dim()`.
pub fn segment_sum_with<T: Element>(
    width: Width,
    data: &[T],
    lengths: &[usize],
    out: &mut [T],
) -> Result<()> {
    let dim = width.dim();
    validate_ragged("pooling input", lengths, dim, data.len())?;
    validate_buffer_len("pooling output", out.len(), lengths.len() * dim)?;

    let mut offset = 0;
    for (&len, pooled) in lengths.iter().zip(out.chunks_exact_mut(dim)) {
        let run = &data[offset..offset + len * dim];
        match width {
            Width::One => sum_run_one(run, pooled),
            Width::Two => sum_run_two(run, pooled),
            Width::General(dim) => sum_run_general(run, dim, pooled),
        }
        offset += len * dim;
    }
    Ok(())
}

#[inline]
fn sum_run_one<T: Element>(run: &[T], pooled: &mut [T]) {
    let mut sum = 0.0f64;
    for &v in run {
        sum += v.to_f64();
    }
    pooled[0] = T::from_f64(sum);
}

#[inline]
fn sum_run_two<T: Element>(run: &[T], pooled: &mut [T]) {
    let (mut s0, mut s1) = (0.0f64, 0.0f64);
    for pair in run.chunks_exact(2) {
        s0 += pair[0].to_f64();
        s1 += pair[1].to_f64();
    }
    pooled[0] = T::from_f64(s0);
    pooled[1] = T::from_f64(s1);
}

/// One component at a time, so no scratch accumulator is needed.
#[inline]
fn sum_run_general<T: Element>(run: &[T], dim: usize, pooled: &mut [T]) {
    for (d, slot) in pooled.iter_mut().enumerate() {
        let mut sum = 0.0f64;
        for v in run.iter().skip(d).step_by(dim) {
            sum += v.to_f64();
        }
        *slot = T::from_f64(sum);
    }
}

// ---------------------------------------------------------------------------
// Backward: broadcast
// ---------------------------------------------------------------------------

/// Copy each example's gradient to every position of its run.
///
/// `grad_output` holds `lengths.len() * dim` elements, `grad_input` holds
/// `sum(lengths) * dim`. This is the exact adjoint of [`segment_sum`].
///
/// # Errors
///
/// Returns [`ValidationError`](crate::error::ValidationError) if either
/// buffer does not match `lengths` and `dim`. Nothing is written on error.
pub fn segment_broadcast<T: Element>(
    grad_output: &[T],
    lengths: &[usize],
    dim: usize,
    grad_input: &mut [T],
) -> Result<()> {
    segment_broadcast_with(Width::for_dim(dim), grad_output, lengths, grad_input)
}

/// [`segment_broadcast`] with an explicit code path.
///
/// # Errors
///
/// Same conditions as [`segment_broadcast`], with `dim = width.dim()`.
pub fn segment_broadcast_with<T: Element>(
    width: Width,
    grad_output: &[T],
    lengths: &[usize],
    grad_input: &mut [T],
) -> Result<()> {
    let dim = width.dim();
    validate_ragged("pooling grad input", lengths, dim, grad_input.len())?;
    validate_buffer_len("pooling grad output", grad_output.len(), lengths.len() * dim)?;

    let mut offset = 0;
    for (&len, grad) in lengths.iter().zip(grad_output.chunks_exact(dim)) {
        let run = &mut grad_input[offset..offset + len * dim];
        match width {
            Width::One => run.fill(grad[0]),
            Width::Two => {
                for pair in run.chunks_exact_mut(2) {
                    pair[0] = grad[0];
                    pair[1] = grad[1];
                }
            }
            Width::General(_) => {
                for position in run.chunks_exact_mut(dim) {
                    position.copy_from_slice(grad);
                }
            }
        }
        offset += len * dim;
    }
    Ok(())
}
