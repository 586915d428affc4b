//! TF-IDF weighting of an index stream.
//!
//! Turns bare word indices into `(index, weight)` pairs, down-weighting
//! frequent words by `1 / (freq + 10)^tfpow` and L2-normalising the weights.

use tracing::{debug, warn};

use crate::error::{Result, ValidationError};
use crate::types::IndexBatch;
use crate::validation::{validate_buffer_len, validate_finite, validate_index_batch};

/// Additive smoothing applied to the raw frequency before exponentiation.
pub const FREQ_OFFSET: f32 = 10.0;

/// Norms at or below this value are left un-normalised.
pub const MIN_NORM: f64 = 1e-5;

/// Weight a stream of 1-based word indices by inverse corpus frequency.
///
/// Writes `indices.len()` pairs into `out` (`out.len() == 2 * indices.len()`):
/// even offsets hold the original index, odd offsets the weight. With
/// `tfpow <= 0` every raw weight is 1. After weighting, the weight vector is
/// divided by its L2 norm unless that norm is `<= 1e-5`.
///
/// The squared weights are summed in `f64`.
///
/// # Errors
///
/// Returns [`ValidationError`] if `out` is mis-sized, `tfpow` is not finite,
/// an index is not a positive integer within `freqs`, or a referenced
/// frequency is not finite. Nothing is written on error.
///
/// # Examples
///
/// ```
/// use ruvector_sparse_embed::tfidf::add_tfidf;
///
/// let freqs = [0.0, 0.0];
/// let mut out = [0.0f32; 4];
/// add_tfidf(&[1.0, 2.0], &freqs, 1.0, &mut out).unwrap();
/// assert_eq!(out[0], 1.0);
/// assert!((out[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
/// ```
pub fn add_tfidf(indices: &[f32], freqs: &[f64], tfpow: f64, out: &mut [f32]) -> Result<()> {
    validate_buffer_len("tfidf output", out.len(), 2 * indices.len())?;
    validate_finite("tfpow", tfpow)?;
    let batch = IndexBatch::bare(indices);
    validate_index_batch(&batch, Some(freqs.len()))?;
    if tfpow > 0.0 {
        for (position, &raw) in indices.iter().enumerate() {
            let freq = freqs[raw as usize - 1];
            if !freq.is_finite() {
                return Err(ValidationError::NonFiniteValue(format!(
                    "frequency of word {raw} (entry {position}) = {freq}",
                )));
            }
        }
    }

    let mut sum = 0.0f64;
    for (pair, &raw) in out.chunks_exact_mut(2).zip(indices) {
        let power = if tfpow > 0.0 {
            let freq = freqs[raw as usize - 1] as f32;
            (1.0 / ((freq + FREQ_OFFSET) as f64).powf(tfpow)) as f32
        } else {
            1.0
        };
        pair[0] = raw;
        pair[1] = power;
        sum += (power * power) as f64;
    }

    let norm = sum.sqrt() as f32;
    if (norm as f64) > MIN_NORM {
        for pair in out.chunks_exact_mut(2) {
            pair[1] /= norm;
        }
    } else if !indices.is_empty() {
        warn!(
            norm = norm as f64,
            entries = indices.len(),
            "tf-idf weights too small to normalise; leaving raw weights",
        );
    }

    debug!(entries = indices.len(), tfpow, norm = norm as f64, "tf-idf weighted");
    Ok(())
}
