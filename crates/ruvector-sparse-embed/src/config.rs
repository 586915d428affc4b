//! Configuration for the embedding kernels.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Tunables shared by the kernels and the reference pipeline.
///
/// Missing fields fall back to [`Default`] when deserialising.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingKernelConfig {
    /// TF-IDF exponent; `<= 0` gives every word weight 1 before normalising.
    pub tfpow: f64,

    /// Minimum document frequency; rarer leading indices become the unknown
    /// sentinel. `0` disables filtering.
    pub dict_min_occ: f64,

    /// Apply the positional transform between lookup and pooling.
    pub positional_encoding: bool,

    /// Scale folded into every accumulated gradient row.
    pub grad_scale: f32,

    /// Step size of the embedding table update.
    pub learning_rate: f32,

    /// Initial slot count of the sparse gradient accumulator.
    pub accumulator_capacity: usize,
}

impl Default for EmbeddingKernelConfig {
    fn default() -> Self {
        Self {
            tfpow: 0.5,
            dict_min_occ: 0.0,
            positional_encoding: false,
            grad_scale: 1.0,
            learning_rate: 0.01,
            accumulator_capacity: 1024,
        }
    }
}

impl EmbeddingKernelConfig {
    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] for the first field
    /// outside its range.
    pub fn validate(&self) -> Result<()> {
        if !self.tfpow.is_finite() {
            return Err(out_of_range("tfpow", self.tfpow, "a finite value"));
        }
        if !self.dict_min_occ.is_finite() || self.dict_min_occ < 0.0 {
            return Err(out_of_range("dict_min_occ", self.dict_min_occ, "finite and >= 0"));
        }
        if !self.grad_scale.is_finite() {
            return Err(out_of_range("grad_scale", self.grad_scale, "a finite value"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(out_of_range("learning_rate", self.learning_rate, "finite and >= 0"));
        }
        if self.accumulator_capacity == 0 {
            return Err(out_of_range("accumulator_capacity", 0, ">= 1"));
        }
        Ok(())
    }
}

fn out_of_range(name: &str, value: impl ToString, expected: &str) -> ValidationError {
    ValidationError::ParameterOutOfRange {
        name: name.into(),
        value: value.to_string(),
        expected: expected.into(),
    }
}
