//! Position-dependent reweighting of ragged sequences.
//!
//! Each position `j` of a length-`len` sequence is scaled per dimension `k`
//! by
//!
//! ```text
//! frac  = (j + 1) / len
//! coeff = (1 - frac) - (k + 1) / d * (1 - 2 * frac)
//! ```
//!
//! so low dimensions emphasise the start of a sequence and high dimensions its
//! end. The transform is an elementwise scaling and therefore its own adjoint.

use crate::error::Result;
use crate::validation::{validate_buffer_len, validate_nonempty_segments, validate_ragged};

/// Coefficient for position `j` (0-based) of a `len`-long sequence at
/// dimension `k` of `dim`.
///
/// `frac` and the per-dimension ratio are computed in `f32`; the blend is
/// evaluated in `f64` and rounded once.
#[inline]
pub fn positional_coeff(j: usize, len: usize, k: usize, dim: usize) -> f32 {
    let frac = (j + 1) as f32 / len as f32;
    let head = (1.0 - frac) as f64;
    let tail = 1.0 - 2.0 * frac as f64;
    let ratio = (k + 1) as f32 / dim as f32;
    (head - ratio as f64 * tail) as f32
}

/// Apply the positional transform: `result[p] = input[p] * coeff`.
///
/// `input` and `result` hold `sum(lengths) * dim` elements; `input` is not
/// modified.
///
/// # Errors
///
/// Returns [`ValidationError`](crate::error::ValidationError) on buffer size
/// mismatch or if any sequence is empty.
pub fn positional_transform(
    input: &[f32],
    lengths: &[usize],
    dim: usize,
    result: &mut [f32],
) -> Result<()> {
    validate_ragged("positional input", lengths, dim, input.len())?;
    validate_buffer_len("positional result", result.len(), input.len())?;
    validate_nonempty_segments(lengths)?;

    let mut offset = 0;
    for &len in lengths {
        for j in 0..len {
            let base = offset + j * dim;
            for k in 0..dim {
                result[base + k] = input[base + k] * positional_coeff(j, len, k, dim);
            }
        }
        offset += len * dim;
    }
    Ok(())
}

/// Backward pass of [`positional_transform`].
///
/// The forward pass scales each element by a constant, so the input gradient
/// is the output gradient scaled by the same coefficient.
///
/// # Errors
///
/// Same conditions as [`positional_transform`].
#[inline]
pub fn positional_transform_backward(
    grad_output: &[f32],
    lengths: &[usize],
    dim: usize,
    grad_input: &mut [f32],
) -> Result<()> {
    positional_transform(grad_output, lengths, dim, grad_input)
}
