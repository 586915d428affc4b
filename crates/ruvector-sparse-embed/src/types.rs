//! Core buffer views shared by every kernel.
//!
//! Provides [`Shape`] for the leading-batch shape descriptor, [`IndexBatch`]
//! for bare or weighted index streams, [`Width`] for pooling dimension
//! dispatch, and the [`Element`] trait that lets pooling run over both `f32`
//! and `f64` buffers.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Wire index reserved for "unknown / filtered" words.
pub const UNKNOWN_INDEX: f32 = 3.0;

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Shape descriptor of a flat tensor buffer.
///
/// `sizes[0]` is always the batch (example) count; the product of the
/// remaining extents is the per-example stride, `data_len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    sizes: Vec<usize>,
}

impl Shape {
    /// Build a shape from its per-axis extents.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] if `sizes` is empty.
    pub fn new(sizes: impl Into<Vec<usize>>) -> Result<Self> {
        let sizes = sizes.into();
        if sizes.is_empty() {
            return Err(ValidationError::DimensionMismatch(
                "shape needs at least a batch dimension".into(),
            ));
        }
        Ok(Self { sizes })
    }

    /// Shorthand for a `[batch, data_len]` matrix shape.
    pub fn matrix(batch: usize, data_len: usize) -> Self {
        Self {
            sizes: vec![batch, data_len],
        }
    }

    /// Number of examples (rows).
    #[inline]
    pub fn batch(&self) -> usize {
        self.sizes[0]
    }

    /// Elements per example: the product of all extents past the first.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.sizes[1..].iter().product()
    }

    /// Total element count.
    #[inline]
    pub fn numel(&self) -> usize {
        self.batch() * self.data_len()
    }

    /// Per-axis extents.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

// ---------------------------------------------------------------------------
// Index streams
// ---------------------------------------------------------------------------

/// Layout of an index stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexLayout {
    /// One float per entry: the 1-based word index.
    Bare,
    /// Two floats per entry: `(index, weight)`.
    Pairs,
}

impl IndexLayout {
    /// Floats consumed per entry.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            Self::Bare => 1,
            Self::Pairs => 2,
        }
    }
}

/// A borrowed index stream in wire format.
///
/// Indices are stored as floats and are 1-based; the kernels translate to
/// 0-based rows after validation.
#[derive(Debug, Clone, Copy)]
pub struct IndexBatch<'a> {
    data: &'a [f32],
    layout: IndexLayout,
}

impl<'a> IndexBatch<'a> {
    /// Wrap a stream with the given layout.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] if a pair stream has an
    /// odd number of floats.
    pub fn new(data: &'a [f32], layout: IndexLayout) -> Result<Self> {
        if data.len() % layout.stride() != 0 {
            return Err(ValidationError::DimensionMismatch(format!(
                "pair stream length {} is not a multiple of 2",
                data.len(),
            )));
        }
        Ok(Self { data, layout })
    }

    /// Unweighted stream: every entry has scale 1.
    pub fn bare(data: &'a [f32]) -> Self {
        Self {
            data,
            layout: IndexLayout::Bare,
        }
    }

    /// Weighted `(index, weight)` stream, e.g. the output of
    /// [`add_tfidf`](crate::tfidf::add_tfidf).
    pub fn pairs(data: &'a [f32]) -> Result<Self> {
        Self::new(data, IndexLayout::Pairs)
    }

    /// Stream layout.
    pub fn layout(&self) -> IndexLayout {
        self.layout
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.layout.stride()
    }

    /// True when the stream holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw (float, 1-based) index of entry `i`.
    #[inline]
    pub fn raw_index(&self, i: usize) -> f32 {
        self.data[i * self.layout.stride()]
    }

    /// Scale of entry `i`: its paired weight, or 1 for bare streams.
    #[inline]
    pub fn coeff(&self, i: usize) -> f32 {
        match self.layout {
            IndexLayout::Bare => 1.0,
            IndexLayout::Pairs => self.data[2 * i + 1],
        }
    }

    /// Underlying wire buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

// ---------------------------------------------------------------------------
// Ragged lengths
// ---------------------------------------------------------------------------

/// Convert float-encoded ragged lengths into integer run lengths.
///
/// Host frameworks often ship lengths as a float tensor. Every value must be a
/// finite, non-negative integer.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidLength`] for the first offending example.
///
/// # Examples
///
/// ```
/// use ruvector_sparse_embed::types::lengths_from_f32;
///
/// assert_eq!(lengths_from_f32(&[2.0, 0.0, 3.0]).unwrap(), vec![2, 0, 3]);
/// assert!(lengths_from_f32(&[1.5]).is_err());
/// ```
pub fn lengths_from_f32(lengths: &[f32]) -> Result<Vec<usize>> {
    lengths
        .iter()
        .enumerate()
        .map(|(example, &value)| {
            if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
                Err(ValidationError::InvalidLength { example, value })
            } else {
                Ok(value as usize)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pooling width dispatch
// ---------------------------------------------------------------------------

/// Vector width of a pooled position, with fast paths for narrow vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Scalar per position.
    One,
    /// Pair per position.
    Two,
    /// Any width, looped over the inner dimension.
    General(usize),
}

impl Width {
    /// Pick the specialised path for `dim` where one exists.
    #[inline]
    pub const fn for_dim(dim: usize) -> Self {
        match dim {
            1 => Self::One,
            2 => Self::Two,
            d => Self::General(d),
        }
    }

    /// Number of elements per position.
    #[inline]
    pub const fn dim(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::General(d) => d,
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// Floating-point element stored in a pooling buffer.
///
/// Sums are carried in `f64` regardless of the storage type.
pub trait Element: Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// Widen to the accumulation type.
    fn to_f64(self) -> f64;
    /// Narrow from the accumulation type.
    fn from_f64(value: f64) -> Self;
}

impl Element for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_data_len_is_product_of_trailing_extents() {
        let shape = Shape::new(vec![4, 3, 2]).unwrap();
        assert_eq!(shape.batch(), 4);
        assert_eq!(shape.data_len(), 6);
        assert_eq!(shape.numel(), 24);
    }

    #[test]
    fn shape_with_only_batch_has_unit_stride() {
        let shape = Shape::new(vec![5]).unwrap();
        assert_eq!(shape.data_len(), 1);
        assert_eq!(shape.numel(), 5);
    }

    #[test]
    fn empty_shape_rejected() {
        assert!(matches!(
            Shape::new(Vec::new()),
            Err(ValidationError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn pair_stream_exposes_weights() {
        let data = [4.0, 0.5, 7.0, 0.25];
        let batch = IndexBatch::pairs(&data).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.raw_index(1), 7.0);
        assert_eq!(batch.coeff(0), 0.5);
    }

    #[test]
    fn bare_stream_has_unit_coeff() {
        let data = [4.0, 7.0, 9.0];
        let batch = IndexBatch::bare(&data);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.raw_index(2), 9.0);
        assert_eq!(batch.coeff(2), 1.0);
    }

    #[test]
    fn odd_pair_stream_rejected() {
        assert!(IndexBatch::pairs(&[1.0, 0.5, 2.0]).is_err());
    }

    #[test]
    fn float_lengths_must_be_whole() {
        assert!(matches!(
            lengths_from_f32(&[1.0, -1.0]),
            Err(ValidationError::InvalidLength { example: 1, .. })
        ));
        assert!(lengths_from_f32(&[f32::NAN]).is_err());
    }

    #[test]
    fn width_dispatch() {
        assert_eq!(Width::for_dim(1), Width::One);
        assert_eq!(Width::for_dim(2), Width::Two);
        assert_eq!(Width::for_dim(5), Width::General(5));
        assert_eq!(Width::General(2).dim(), 2);
    }
}
