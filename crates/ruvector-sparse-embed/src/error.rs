//! Error types for the embedding kernels.
//!
//! Two failure kinds exist and they never mix:
//!
//! - [`ValidationError`]: a contract violation in caller-supplied buffers or
//!   parameters, detected eagerly before any output is written.
//! - [`CapacityExhausted`]: the sparse gradient accumulator ran out of slots.
//!   This is the one expected, recoverable condition; the caller grows the
//!   accumulator and replays the batch.
//!
//! [`KernelError`] wraps both for call sites that compose several kernels.

/// Primary error type for composed kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The caller supplied invalid input (dimensions, indices, parameters).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The sparse gradient accumulator has no free slot left.
    #[error(transparent)]
    CapacityExhausted(#[from] CapacityExhausted),
}

/// The accumulator's slot counter reached its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("gradient accumulator exhausted: {requested} slots requested, capacity {capacity}")]
pub struct CapacityExhausted {
    /// Number of rows the accumulator can hold.
    pub capacity: usize,
    /// Slot count that would have been needed to continue.
    pub requested: usize,
}

/// Validation errors for kernel inputs.
///
/// These are raised before any computation begins so that a bad buffer never
/// causes a partial write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Buffer extents are inconsistent with the declared shape or lengths.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A value is NaN or infinite where a finite number is required.
    #[error("non-finite value detected: {0}")]
    NonFiniteValue(String),

    /// A wire index is not a positive integer.
    #[error("invalid word index {value} at position {position} (expected an integer >= 1)")]
    InvalidIndex {
        /// Entry position in the index stream.
        position: usize,
        /// The offending raw value.
        value: f32,
    },

    /// A wire index addresses a row past the end of the table.
    #[error("word index {index} at position {position} out of bounds for vocabulary of {vocab}")]
    IndexOutOfBounds {
        /// Entry position in the index stream.
        position: usize,
        /// The 1-based wire index.
        index: usize,
        /// Number of rows available.
        vocab: usize,
    },

    /// A ragged run has zero length where the kernel divides by it.
    #[error("example {example} has an empty segment")]
    EmptySegment {
        /// Example whose run is empty.
        example: usize,
    },

    /// A float-encoded ragged length is negative, fractional, or non-finite.
    #[error("example {example} has invalid length {value}")]
    InvalidLength {
        /// Example whose length is invalid.
        example: usize,
        /// The offending raw value.
        value: f32,
    },

    /// A parameter is outside its valid range.
    #[error("parameter out of range: {name} = {value} (expected {expected})")]
    ParameterOutOfRange {
        /// Name of the parameter.
        name: String,
        /// The invalid value (as a string for flexibility).
        value: String,
        /// Human-readable description of the valid range.
        expected: String,
    },
}

/// Convenience alias for kernel results that can only fail validation.
pub type Result<T, E = ValidationError> = std::result::Result<T, E>;
