//! Weighted lookup table: sparse gather forward, scatter-accumulate backward.
//!
//! The embedding table is a row-major `vocab x data_len` buffer owned by the
//! caller. Index streams are 1-based on the wire; entry `i` addresses row
//! `index(i) - 1` and carries a scale `coeff(i)` (its paired weight, or 1 for
//! bare streams).
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`lookup_forward`] | `out[i] = table[word(i)] * coeff(i)` |
//! | [`accumulate_gradients`] | slot `s` of the accumulator gets `scale * coeff(i) * grad[i]` |
//! | [`update_parameters`] | `table[row(s)] -= lr * acc[s]` for every filled slot |
//! | [`apply_gradients_direct`] | `table[word(i)] -= lr * coeff(i) * grad[i]` without an accumulator |

use tracing::{debug, trace};

use crate::accumulator::{AccumulateStatus, SparseGradAccumulator};
use crate::error::{Result, ValidationError};
use crate::types::{IndexBatch, IndexLayout};
use crate::validation::{
    validate_buffer_len, validate_finite, validate_index_batch, validate_table,
};

// ---------------------------------------------------------------------------
// Forward
// ---------------------------------------------------------------------------

/// Gather one scaled table row per entry.
///
/// `output` holds `batch.len() * data_len` elements.
///
/// # Errors
///
/// Returns [`ValidationError`] if the table is not a whole number of rows, an
/// index is invalid or out of range, a weight is not finite, or `output` is
/// mis-sized. Nothing is written on error.
///
/// # Examples
///
/// ```
/// use ruvector_sparse_embed::lookup::lookup_forward;
/// use ruvector_sparse_embed::types::IndexBatch;
///
/// let table = [1.0f32, 2.0, 3.0, 4.0]; // two rows of width 2
/// let pairs = [2.0f32, 0.5];
/// let mut out = [0.0f32; 2];
/// lookup_forward(&IndexBatch::pairs(&pairs).unwrap(), &table, 2, &mut out).unwrap();
/// assert_eq!(out, [1.5, 2.0]);
/// ```
pub fn lookup_forward(
    batch: &IndexBatch<'_>,
    table: &[f32],
    data_len: usize,
    output: &mut [f32],
) -> Result<()> {
    let vocab = validate_table("embedding table", table.len(), data_len)?;
    validate_index_batch(batch, Some(vocab))?;
    validate_buffer_len("lookup output", output.len(), batch.len() * data_len)?;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        output
            .par_chunks_mut(data_len)
            .enumerate()
            .for_each(|(i, out_row)| gather_row(batch, table, data_len, i, out_row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (i, out_row) in output.chunks_exact_mut(data_len).enumerate() {
            gather_row(batch, table, data_len, i, out_row);
        }
    }

    trace!(entries = batch.len(), data_len, "lookup forward");
    Ok(())
}

#[inline]
fn gather_row(batch: &IndexBatch<'_>, table: &[f32], data_len: usize, i: usize, out_row: &mut [f32]) {
    let word = batch.raw_index(i) as usize - 1;
    let row = &table[word * data_len..(word + 1) * data_len];
    match batch.layout() {
        IndexLayout::Bare => out_row.copy_from_slice(row),
        IndexLayout::Pairs => {
            let coeff = batch.coeff(i);
            for (o, &w) in out_row.iter_mut().zip(row) {
                *o = w * coeff;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Backward
// ---------------------------------------------------------------------------

/// Store per-entry gradient rows in the accumulator.
///
/// For each entry in order, claims the next slot, records the entry's table
/// row, and writes `scale * coeff(i) * grad_output[i]` into the slot. Repeated
/// indices each take their own slot.
///
/// If the accumulator fills up, processing stops at the first entry that
/// cannot get a slot and [`AccumulateStatus::Exhausted`] reports how many
/// entries were written. Entries are never silently dropped.
///
/// # Errors
///
/// Returns [`ValidationError`] if `scale` is not finite, an index is not a
/// positive integer, a weight is not finite, or `grad_output` does not hold
/// `batch.len() * acc.data_len()` elements. Nothing is written on error.
pub fn accumulate_gradients(
    batch: &IndexBatch<'_>,
    grad_output: &[f32],
    scale: f32,
    acc: &mut SparseGradAccumulator,
) -> Result<AccumulateStatus> {
    validate_finite("scale", scale as f64)?;
    validate_index_batch(batch, None)?;
    let data_len = acc.data_len();
    validate_buffer_len("lookup grad output", grad_output.len(), batch.len() * data_len)?;

    for (i, grad) in grad_output.chunks_exact(data_len).enumerate() {
        let word = batch.raw_index(i) as usize - 1;
        let slot = match acc.alloc_slot(word) {
            Ok(slot) => slot,
            Err(exhausted) => {
                debug!(
                    capacity = exhausted.capacity,
                    processed = i,
                    remaining = batch.len() - i,
                    "gradient accumulator exhausted",
                );
                return Ok(AccumulateStatus::Exhausted {
                    processed: i,
                    capacity: exhausted.capacity,
                });
            }
        };
        let coeff = match batch.layout() {
            IndexLayout::Bare => scale,
            IndexLayout::Pairs => scale * batch.coeff(i),
        };
        for (dst, &g) in acc.slot_grad_mut(slot).iter_mut().zip(grad) {
            *dst = coeff * g;
        }
    }

    Ok(AccumulateStatus::Complete {
        processed: batch.len(),
    })
}

/// Apply every filled accumulator slot to the table:
/// `table[row(s)] -= lr * acc[s]`, in slot order.
///
/// Returns the number of slots applied.
///
/// # Errors
///
/// Returns [`ValidationError`] if `lr` is not finite, the table row width does
/// not match the accumulator, or a recorded row is outside the table. Nothing
/// is written on error.
pub fn update_parameters(table: &mut [f32], acc: &SparseGradAccumulator, lr: f32) -> Result<usize> {
    validate_finite("learning_rate", lr as f64)?;
    let data_len = acc.data_len();
    let vocab = validate_table("embedding table", table.len(), data_len)?;
    if let Some(slot) = acc.rows().iter().position(|&row| row >= vocab) {
        return Err(ValidationError::IndexOutOfBounds {
            position: slot,
            index: acc.rows()[slot] + 1,
            vocab,
        });
    }

    for (row, grad) in acc.iter() {
        let dst = &mut table[row * data_len..(row + 1) * data_len];
        for (w, &g) in dst.iter_mut().zip(grad) {
            *w -= lr * g;
        }
    }

    debug!(slots = acc.len(), lr, "applied accumulated gradients");
    Ok(acc.len())
}

/// Update the table directly from upstream gradients, skipping the
/// accumulator: `table[word(i)] -= lr * coeff(i) * grad_output[i]`.
///
/// Entries are applied in order, so repeated indices compound.
///
/// # Errors
///
/// Returns [`ValidationError`] if `lr` is not finite, the table is not a whole
/// number of rows, an index is invalid or out of range, or `grad_output` is
/// mis-sized. Nothing is written on error.
pub fn apply_gradients_direct(
    batch: &IndexBatch<'_>,
    grad_output: &[f32],
    lr: f32,
    table: &mut [f32],
    data_len: usize,
) -> Result<()> {
    validate_finite("learning_rate", lr as f64)?;
    let vocab = validate_table("embedding table", table.len(), data_len)?;
    validate_index_batch(batch, Some(vocab))?;
    validate_buffer_len("lookup grad output", grad_output.len(), batch.len() * data_len)?;

    for (i, grad) in grad_output.chunks_exact(data_len).enumerate() {
        let word = batch.raw_index(i) as usize - 1;
        let coeff = match batch.layout() {
            IndexLayout::Bare => lr,
            IndexLayout::Pairs => lr * batch.coeff(i),
        };
        let dst = &mut table[word * data_len..(word + 1) * data_len];
        for (w, &g) in dst.iter_mut().zip(grad) {
            *w -= coeff * g;
        }
    }
    Ok(())
}
