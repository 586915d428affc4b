//! Rare-word filtering.

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::types::{Shape, UNKNOWN_INDEX};
use crate::validation::{validate_buffer_len, validate_finite, validate_word_index};

/// Rewrite rare leading indices to [`UNKNOWN_INDEX`].
///
/// `x` is a flat tensor of `shape`; only the first scalar of each example's
/// `data_len`-wide slice is inspected. If the frequency of that 1-based index
/// (`index_to_freq[index - 1]`) is below `min_occ`, the scalar is overwritten
/// with the sentinel. The rest of each slice is left untouched.
///
/// Returns the number of examples rewritten.
///
/// # Errors
///
/// Returns [`ValidationError`] if `x` does not match `shape`, `min_occ` is not
/// finite, or a leading index is invalid or past the end of `index_to_freq`.
/// Nothing is rewritten on error.
pub fn resolve_min_occ(
    shape: &Shape,
    x: &mut [f32],
    index_to_freq: &[f64],
    min_occ: f64,
) -> Result<usize> {
    validate_buffer_len("min-occ input", x.len(), shape.numel())?;
    validate_finite("min_occ", min_occ)?;
    let data_len = shape.data_len();
    if data_len == 0 {
        return Ok(0);
    }

    for (example, slice) in x.chunks_exact(data_len).enumerate() {
        let word = validate_word_index(slice[0], example)?;
        if word >= index_to_freq.len() {
            return Err(ValidationError::IndexOutOfBounds {
                position: example,
                index: word + 1,
                vocab: index_to_freq.len(),
            });
        }
    }

    let mut rewritten = 0;
    for slice in x.chunks_exact_mut(data_len) {
        let word = slice[0] as usize - 1;
        if index_to_freq[word] < min_occ {
            slice[0] = UNKNOWN_INDEX;
            rewritten += 1;
        }
    }

    debug!(examples = shape.batch(), rewritten, min_occ, "resolved rare words");
    Ok(rewritten)
}
