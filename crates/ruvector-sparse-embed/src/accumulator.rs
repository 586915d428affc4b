//! Bounded sparse gradient accumulator.
//!
//! [`SparseGradAccumulator`] owns a compact list of `(slot -> table row)`
//! entries and a dense `capacity x data_len` gradient buffer. Slots are handed
//! out in order by [`alloc_slot`](SparseGradAccumulator::alloc_slot), which
//! refuses to go past capacity instead of dropping gradients.
//!
//! # Retry protocol
//!
//! 1. [`reset`](SparseGradAccumulator::reset) before each accumulation pass.
//! 2. Run [`accumulate_gradients`](crate::lookup::accumulate_gradients).
//! 3. On [`AccumulateStatus::Exhausted`], [`grow`](SparseGradAccumulator::grow)
//!    and replay the entries that were not processed (or reset and replay the
//!    whole batch).
//! 4. Apply with [`update_parameters`](crate::lookup::update_parameters).
//!
//! Repeated rows are not merged: every entry takes its own slot.

use tracing::debug;

use crate::config::EmbeddingKernelConfig;
use crate::error::{CapacityExhausted, Result, ValidationError};

/// Outcome of one accumulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulateStatus {
    /// Every entry was written.
    Complete {
        /// Entries processed in this call.
        processed: usize,
    },
    /// The accumulator filled up; entries from `processed` on were skipped.
    Exhausted {
        /// Entries fully written before the accumulator filled up.
        processed: usize,
        /// Capacity at the time of exhaustion.
        capacity: usize,
    },
}

impl AccumulateStatus {
    /// Wire status: 0 when complete, 1 when exhausted.
    #[inline]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Complete { .. } => 0,
            Self::Exhausted { .. } => 1,
        }
    }

    /// Entries processed in this call.
    #[inline]
    pub const fn processed(&self) -> usize {
        match *self {
            Self::Complete { processed } | Self::Exhausted { processed, .. } => processed,
        }
    }

    /// True when the accumulator filled up.
    #[inline]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Convert into a `Result` for `?`-style callers.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExhausted`] for [`AccumulateStatus::Exhausted`].
    pub fn into_result(self) -> std::result::Result<usize, CapacityExhausted> {
        match self {
            Self::Complete { processed } => Ok(processed),
            Self::Exhausted { capacity, .. } => Err(CapacityExhausted {
                capacity,
                requested: capacity + 1,
            }),
        }
    }
}

/// Fixed-capacity store of per-entry gradient rows.
#[derive(Debug, Clone)]
pub struct SparseGradAccumulator {
    /// Table row (0-based) recorded for each filled slot.
    rows: Vec<usize>,
    /// Dense gradient rows, `capacity * data_len` elements.
    grads: Vec<f32>,
    capacity: usize,
    data_len: usize,
}

impl SparseGradAccumulator {
    /// Create an empty accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] if `data_len` is zero
    /// or `capacity * data_len` overflows.
    pub fn new(capacity: usize, data_len: usize) -> Result<Self> {
        if data_len == 0 {
            return Err(ValidationError::ParameterOutOfRange {
                name: "data_len".into(),
                value: "0".into(),
                expected: ">= 1".into(),
            });
        }
        let elements = capacity.checked_mul(data_len).ok_or_else(|| {
            ValidationError::ParameterOutOfRange {
                name: "capacity".into(),
                value: capacity.to_string(),
                expected: format!("capacity * {data_len} to fit in usize"),
            }
        })?;
        Ok(Self {
            rows: Vec::with_capacity(capacity),
            grads: vec![0.0; elements],
            capacity,
            data_len,
        })
    }

    /// Create an accumulator sized by
    /// [`accumulator_capacity`](EmbeddingKernelConfig::accumulator_capacity).
    ///
    /// # Errors
    ///
    /// Same conditions as [`new`](Self::new).
    pub fn from_config(config: &EmbeddingKernelConfig, data_len: usize) -> Result<Self> {
        Self::new(config.accumulator_capacity, data_len)
    }

    /// Maximum number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Elements per gradient row.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Number of filled slots (the next free slot index).
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no slot is filled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Slots still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.rows.len()
    }

    /// Clear the fill counter for a new pass. Capacity is kept.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// Claim the next slot for table row `row`.
    ///
    /// Returns the slot index; its gradient row is available through
    /// [`slot_grad_mut`](Self::slot_grad_mut).
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExhausted`] when every slot is taken. The
    /// accumulator is unchanged in that case.
    pub fn alloc_slot(&mut self, row: usize) -> std::result::Result<usize, CapacityExhausted> {
        let slot = self.rows.len();
        if slot >= self.capacity {
            return Err(CapacityExhausted {
                capacity: self.capacity,
                requested: slot + 1,
            });
        }
        self.rows.push(row);
        Ok(slot)
    }

    /// Enlarge capacity to `new_capacity`, keeping filled slots.
    ///
    /// Shrinking is not supported; a smaller value leaves the accumulator
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] if the new buffer size
    /// overflows.
    pub fn grow(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity <= self.capacity {
            return Ok(());
        }
        let elements = new_capacity.checked_mul(self.data_len).ok_or_else(|| {
            ValidationError::ParameterOutOfRange {
                name: "capacity".into(),
                value: new_capacity.to_string(),
                expected: format!("capacity * {} to fit in usize", self.data_len),
            }
        })?;
        debug!(from = self.capacity, to = new_capacity, filled = self.len(), "growing accumulator");
        self.grads.resize(elements, 0.0);
        self.rows.reserve(new_capacity - self.rows.len());
        self.capacity = new_capacity;
        Ok(())
    }

    /// Table row recorded for each filled slot, in slot order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Gradient row of a filled slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= self.len()`.
    pub fn slot_grad(&self, slot: usize) -> &[f32] {
        assert!(slot < self.len(), "slot {slot} is not filled ({} filled)", self.len());
        &self.grads[slot * self.data_len..(slot + 1) * self.data_len]
    }

    /// Mutable gradient row of a filled slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= self.len()`.
    pub fn slot_grad_mut(&mut self, slot: usize) -> &mut [f32] {
        assert!(slot < self.len(), "slot {slot} is not filled ({} filled)", self.len());
        &mut self.grads[slot * self.data_len..(slot + 1) * self.data_len]
    }

    /// Filled slots as `(row, gradient)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> + '_ {
        self.rows
            .iter()
            .copied()
            .zip(self.grads.chunks_exact(self.data_len))
    }
}
