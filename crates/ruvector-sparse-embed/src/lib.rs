//! Sparse bag-of-words embedding kernels for the ruvector ecosystem.
//!
//! This crate implements the inner loop of a sparse embedding layer: turning
//! ragged batches of word indices into weighted, pooled embedding vectors and
//! accumulating sparse gradients back into a shared embedding table.
//!
//! Every kernel is a synchronous function over caller-owned flat buffers. It
//! validates its inputs up front and never allocates or partially writes.
//!
//! # Kernels
//!
//! | Kernel | Module | Operation |
//! |--------|--------|-----------|
//! | TF-IDF weighter | [`tfidf`] | indices -> L2-normalised `(index, weight)` pairs |
//! | Rare-word filter | [`min_occ`] | rare leading indices -> sentinel `3` |
//! | Positional transform | [`positional`] | per-position, per-dimension rescaling |
//! | Segment pooling | [`pooling`] | ragged sum and its broadcast adjoint |
//! | Lookup table | [`lookup`] | gather + scale, capacity-checked gradient accumulation, update |
//!
//! # Example
//!
//! ```rust
//! use ruvector_sparse_embed::accumulator::SparseGradAccumulator;
//! use ruvector_sparse_embed::lookup::{accumulate_gradients, lookup_forward, update_parameters};
//! use ruvector_sparse_embed::pooling::{segment_broadcast, segment_sum};
//! use ruvector_sparse_embed::types::IndexBatch;
//!
//! // Vocabulary of 3 words, embedding width 2.
//! let mut table = vec![1.0f32, 0.0, 0.0, 1.0, 1.0, 1.0];
//! let words = [1.0f32, 3.0, 2.0];
//! let lengths = [2, 1];
//!
//! let batch = IndexBatch::bare(&words);
//! let mut embedded = vec![0.0f32; 6];
//! lookup_forward(&batch, &table, 2, &mut embedded).unwrap();
//!
//! let mut pooled = vec![0.0f32; 4];
//! segment_sum(&embedded, &lengths, 2, &mut pooled).unwrap();
//! assert_eq!(pooled, [2.0, 1.0, 0.0, 1.0]);
//!
//! let mut grads = vec![0.0f32; 6];
//! segment_broadcast(&[1.0, 1.0, 0.5, 0.5], &lengths, 2, &mut grads).unwrap();
//!
//! let mut acc = SparseGradAccumulator::new(8, 2).unwrap();
//! let status = accumulate_gradients(&batch, &grads, 1.0, &mut acc).unwrap();
//! assert_eq!(status.code(), 0);
//! update_parameters(&mut table, &acc, 0.1).unwrap();
//! assert_eq!(table[0], 0.9);
//! ```

pub mod accumulator;
pub mod config;
pub mod error;
pub mod lookup;
pub mod min_occ;
pub mod pipeline;
pub mod pooling;
pub mod positional;
pub mod tfidf;
pub mod types;
pub mod validation;

pub use accumulator::{AccumulateStatus, SparseGradAccumulator};
pub use config::EmbeddingKernelConfig;
pub use error::{CapacityExhausted, KernelError, ValidationError};
pub use types::{Element, IndexBatch, IndexLayout, Shape, Width, UNKNOWN_INDEX};
