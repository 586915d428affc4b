//! Reference composition of the kernels for a bag-of-words encoder.
//!
//! ```text
//! forward:  indices -> rare-word filter -> tf-idf -> lookup -> [positional] -> segment sum
//! backward: pooled grad -> broadcast -> [positional adjoint] -> accumulate -> update
//! ```
//!
//! Unlike the kernels, the pipeline allocates its own intermediate buffers.

use tracing::{debug, instrument};

use crate::accumulator::{AccumulateStatus, SparseGradAccumulator};
use crate::config::EmbeddingKernelConfig;
use crate::error::{KernelError, ValidationError};
use crate::lookup::{accumulate_gradients, lookup_forward, update_parameters};
use crate::min_occ::resolve_min_occ;
use crate::pooling::{segment_broadcast, segment_sum};
use crate::positional::{positional_transform, positional_transform_backward};
use crate::tfidf::add_tfidf;
use crate::types::{IndexBatch, Shape};

/// Forward state needed for the backward pass.
#[derive(Debug, Clone)]
pub struct PooledBatch {
    /// `(index, weight)` pairs of every position, examples concatenated.
    pub pairs: Vec<f32>,
    /// Positions per example.
    pub lengths: Vec<usize>,
    /// Embedding width.
    pub data_len: usize,
    /// One pooled embedding per example, `lengths.len() * data_len` elements.
    pub pooled: Vec<f32>,
}

impl PooledBatch {
    /// Pooled embedding of one example.
    pub fn example(&self, i: usize) -> &[f32] {
        &self.pooled[i * self.data_len..(i + 1) * self.data_len]
    }
}

/// Bag-of-words encoder driven by [`EmbeddingKernelConfig`].
#[derive(Debug, Clone)]
pub struct BagOfWordsPipeline {
    config: EmbeddingKernelConfig,
}

impl BagOfWordsPipeline {
    /// Create a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the configuration is invalid.
    pub fn new(config: EmbeddingKernelConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &EmbeddingKernelConfig {
        &self.config
    }

    /// Encode a batch of examples, each a stream of 1-based word indices.
    ///
    /// `freqs[i - 1]` is the document frequency of word `i`; `table` is the
    /// row-major embedding table with rows of `data_len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidInput`] if any kernel rejects its input,
    /// including empty examples when the positional transform is enabled.
    #[instrument(skip_all, fields(examples = examples.len(), data_len = data_len))]
    pub fn forward(
        &self,
        examples: &[&[f32]],
        freqs: &[f64],
        table: &[f32],
        data_len: usize,
    ) -> Result<PooledBatch, KernelError> {
        let lengths: Vec<usize> = examples.iter().map(|e| e.len()).collect();
        let positions: usize = lengths.iter().sum();

        let mut pairs = vec![0.0f32; 2 * positions];
        let mut offset = 0;
        for example in examples {
            let mut indices = example.to_vec();
            if self.config.dict_min_occ > 0.0 {
                let shape = Shape::new(vec![indices.len()])?;
                resolve_min_occ(&shape, &mut indices, freqs, self.config.dict_min_occ)?;
            }
            let out = &mut pairs[2 * offset..2 * (offset + indices.len())];
            add_tfidf(&indices, freqs, self.config.tfpow, out)?;
            offset += indices.len();
        }

        let mut embedded = vec![0.0f32; positions * data_len];
        lookup_forward(&IndexBatch::pairs(&pairs)?, table, data_len, &mut embedded)?;

        if self.config.positional_encoding {
            let mut shifted = vec![0.0f32; embedded.len()];
            positional_transform(&embedded, &lengths, data_len, &mut shifted)?;
            embedded = shifted;
        }

        let mut pooled = vec![0.0f32; lengths.len() * data_len];
        segment_sum(&embedded, &lengths, data_len, &mut pooled)?;

        debug!(positions, "encoded batch");
        Ok(PooledBatch {
            pairs,
            lengths,
            data_len,
            pooled,
        })
    }

    /// Per-position gradients of the lookup output for the pooled gradient.
    fn position_grads(&self, batch: &PooledBatch, grad_pooled: &[f32]) -> Result<Vec<f32>, KernelError> {
        let positions: usize = batch.lengths.iter().sum();
        let mut grads = vec![0.0f32; positions * batch.data_len];
        segment_broadcast(grad_pooled, &batch.lengths, batch.data_len, &mut grads)?;
        if self.config.positional_encoding {
            let mut shifted = vec![0.0f32; grads.len()];
            positional_transform_backward(&grads, &batch.lengths, batch.data_len, &mut shifted)?;
            grads = shifted;
        }
        Ok(grads)
    }

    /// Accumulate table gradients for `grad_pooled` (one row per example).
    ///
    /// Returns the number of slots written.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::CapacityExhausted`] if the accumulator fills up;
    /// it then holds a partial batch and the caller should reset, grow, and
    /// call again. Returns [`KernelError::InvalidInput`] on malformed input.
    #[instrument(skip_all, fields(examples = batch.lengths.len()))]
    pub fn backward(
        &self,
        batch: &PooledBatch,
        grad_pooled: &[f32],
        acc: &mut SparseGradAccumulator,
    ) -> Result<usize, KernelError> {
        let grads = self.position_grads(batch, grad_pooled)?;
        let status = accumulate_gradients(
            &IndexBatch::pairs(&batch.pairs)?,
            &grads,
            self.config.grad_scale,
            acc,
        )?;
        Ok(status.into_result()?)
    }

    /// Full sparse update: reset, accumulate with grow-and-resume on
    /// exhaustion, then apply to `table` with the configured learning rate.
    ///
    /// Returns the number of slots applied.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidInput`] on malformed input.
    #[instrument(skip_all, fields(examples = batch.lengths.len()))]
    pub fn train_step(
        &self,
        batch: &PooledBatch,
        grad_pooled: &[f32],
        acc: &mut SparseGradAccumulator,
        table: &mut [f32],
    ) -> Result<usize, KernelError> {
        let grads = self.position_grads(batch, grad_pooled)?;
        let data_len = batch.data_len;
        let total = batch.pairs.len() / 2;

        acc.reset();
        let mut start = 0;
        while start < total {
            let entries = IndexBatch::pairs(&batch.pairs[2 * start..])?;
            let status =
                accumulate_gradients(&entries, &grads[start * data_len..], self.config.grad_scale, acc)?;
            match status {
                AccumulateStatus::Complete { .. } => break,
                AccumulateStatus::Exhausted { processed, capacity } => {
                    start += processed;
                    let needed = acc.len() + (total - start);
                    acc.grow((capacity * 2).max(needed))?;
                }
            }
        }

        Ok(update_parameters(table, acc, self.config.learning_rate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmbeddingKernelConfig {
        EmbeddingKernelConfig {
            tfpow: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn forward_pools_normalised_rows() {
        let pipeline = BagOfWordsPipeline::new(config()).unwrap();
        // Identity-like table: word i has a 1 in column i - 1.
        let table = [1.0, 0.0, 0.0, 1.0];
        let freqs = [1.0, 1.0];
        let ex0 = [1.0, 2.0];
        let ex1 = [2.0];

        let batch = pipeline.forward(&[&ex0[..], &ex1[..]], &freqs, &table, 2).unwrap();

        // Two words with uniform weights normalise to 1/sqrt(2) each.
        let w = std::f32::consts::FRAC_1_SQRT_2;
        assert!((batch.example(0)[0] - w).abs() < 1e-6);
        assert!((batch.example(0)[1] - w).abs() < 1e-6);
        assert_eq!(batch.example(1), &[0.0, 1.0]);
        assert_eq!(batch.lengths, vec![2, 1]);
    }

    #[test]
    fn rare_words_map_to_sentinel() {
        let pipeline = BagOfWordsPipeline::new(EmbeddingKernelConfig {
            dict_min_occ: 2.0,
            ..config()
        })
        .unwrap();
        let table = vec![0.0f32; 5];
        let freqs = [5.0, 5.0, 5.0, 5.0, 1.0];
        let ex = [5.0];

        let batch = pipeline.forward(&[&ex[..]], &freqs, &table, 1).unwrap();
        assert_eq!(batch.pairs[0], 3.0);
    }

    #[test]
    fn backward_reports_exhaustion() {
        let pipeline = BagOfWordsPipeline::new(config()).unwrap();
        let table = [1.0, 2.0, 3.0];
        let ex = [1.0, 2.0, 3.0];
        let batch = pipeline.forward(&[&ex[..]], &[0.0; 3], &table, 1).unwrap();

        let mut acc = SparseGradAccumulator::new(2, 1).unwrap();
        let err = pipeline.backward(&batch, &[1.0], &mut acc).unwrap_err();
        assert!(matches!(err, KernelError::CapacityExhausted(_)));
    }

    #[test]
    fn train_step_grows_until_batch_fits() {
        let pipeline = BagOfWordsPipeline::new(EmbeddingKernelConfig {
            learning_rate: 1.0,
            ..config()
        })
        .unwrap();
        let mut table = vec![0.0f32; 4];
        let ex0 = [1.0, 2.0, 3.0, 4.0];
        let ex1 = [1.0];
        let batch = pipeline.forward(&[&ex0[..], &ex1[..]], &[0.0; 4], &table, 1).unwrap();

        let mut acc = SparseGradAccumulator::new(1, 1).unwrap();
        let applied = pipeline.train_step(&batch, &[1.0, 1.0], &mut acc, &mut table).unwrap();

        assert_eq!(applied, 5);
        assert!(acc.capacity() >= 5);
        // Word 1 appears in both examples: 0.5 from the first, 1.0 from the second.
        assert!((table[0] + 1.5).abs() < 1e-6, "table {table:?}");
        assert!((table[1] + 0.5).abs() < 1e-6, "table {table:?}");
    }

    #[test]
    fn positional_encoding_rejects_empty_example() {
        let pipeline = BagOfWordsPipeline::new(EmbeddingKernelConfig {
            positional_encoding: true,
            ..config()
        })
        .unwrap();
        let empty: [f32; 0] = [];
        let err = pipeline.forward(&[&empty[..]], &[1.0], &[1.0], 1).unwrap_err();
        assert!(matches!(
            err,
            KernelError::InvalidInput(ValidationError::EmptySegment { example: 0 })
        ));
    }
}
