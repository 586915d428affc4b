//! Input validation for kernel boundaries.
//!
//! All validation functions run eagerly before any kernel writes, so a
//! malformed buffer is reported as a [`ValidationError`] instead of corrupting
//! memory or producing a half-written output. Every kernel in this crate calls
//! into this module first and then runs an unchecked inner loop.

use crate::error::{Result, ValidationError};
use crate::types::IndexBatch;

// ---------------------------------------------------------------------------
// Buffer extents
// ---------------------------------------------------------------------------

/// Check that a buffer has exactly the expected number of elements.
///
/// # Errors
///
/// Returns [`ValidationError::DimensionMismatch`] naming the buffer.
pub fn validate_buffer_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} length {actual} does not equal expected {expected}",
        )));
    }
    Ok(())
}

/// Validate a ragged batch: `sum(lengths) * dim` must equal `flat_len`.
///
/// Returns the total number of positions across all examples.
///
/// # Errors
///
/// Returns [`ValidationError::ParameterOutOfRange`] if `dim` is zero and
/// [`ValidationError::DimensionMismatch`] if the flat buffer does not match
/// the lengths (including arithmetic overflow).
pub fn validate_ragged(name: &str, lengths: &[usize], dim: usize, flat_len: usize) -> Result<usize> {
    if dim == 0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "dim".into(),
            value: "0".into(),
            expected: ">= 1".into(),
        });
    }

    let positions = lengths
        .iter()
        .try_fold(0usize, |acc, &len| acc.checked_add(len))
        .ok_or_else(|| {
            ValidationError::DimensionMismatch(format!("{name}: sum of lengths overflows usize"))
        })?;

    let expected = positions.checked_mul(dim).ok_or_else(|| {
        ValidationError::DimensionMismatch(format!("{name}: positions * dim overflows usize"))
    })?;

    validate_buffer_len(name, flat_len, expected)?;
    Ok(positions)
}

/// Reject zero-length runs for kernels that divide by the run length.
///
/// # Errors
///
/// Returns [`ValidationError::EmptySegment`] for the first empty example.
pub fn validate_nonempty_segments(lengths: &[usize]) -> Result<()> {
    match lengths.iter().position(|&len| len == 0) {
        Some(example) => Err(ValidationError::EmptySegment { example }),
        None => Ok(()),
    }
}

/// Validate a row-major table buffer and return its row count.
///
/// # Errors
///
/// Returns [`ValidationError::ParameterOutOfRange`] if `data_len` is zero and
/// [`ValidationError::DimensionMismatch`] if the buffer is not a whole number
/// of rows.
pub fn validate_table(name: &str, table_len: usize, data_len: usize) -> Result<usize> {
    if data_len == 0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "data_len".into(),
            value: "0".into(),
            expected: ">= 1".into(),
        });
    }
    if table_len % data_len != 0 {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} length {table_len} is not a multiple of row length {data_len}",
        )));
    }
    Ok(table_len / data_len)
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Require a finite scalar parameter.
///
/// # Errors
///
/// Returns [`ValidationError::NonFiniteValue`] for NaN or infinity.
pub fn validate_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue(format!("{name} = {value}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Word indices
// ---------------------------------------------------------------------------

/// Translate a 1-based wire index into a 0-based row.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidIndex`] unless `raw` is a finite integer
/// `>= 1`.
#[inline]
pub fn validate_word_index(raw: f32, position: usize) -> Result<usize> {
    if !raw.is_finite() || raw < 1.0 || raw.fract() != 0.0 {
        return Err(ValidationError::InvalidIndex {
            position,
            value: raw,
        });
    }
    Ok(raw as usize - 1)
}

/// Validate every entry of an index stream.
///
/// When `vocab` is given, each index must also address an existing row.
/// Paired weights must be finite.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, scanning in entry order.
pub fn validate_index_batch(batch: &IndexBatch<'_>, vocab: Option<usize>) -> Result<()> {
    for i in 0..batch.len() {
        let raw = batch.raw_index(i);
        let row = validate_word_index(raw, i)?;
        if let Some(vocab) = vocab {
            if row >= vocab {
                return Err(ValidationError::IndexOutOfBounds {
                    position: i,
                    index: row + 1,
                    vocab,
                });
            }
        }
        let coeff = batch.coeff(i);
        if !coeff.is_finite() {
            return Err(ValidationError::NonFiniteValue(format!(
                "weight of entry {i} = {coeff}",
            )));
        }
    }
    Ok(())
}
