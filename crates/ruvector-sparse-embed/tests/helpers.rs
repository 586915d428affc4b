//! Shared test helpers for the ruvector-sparse-embed integration test suite.
//!
//! Provides deterministic generators for ragged batches, index streams, and
//! embedding tables, plus dense reference implementations to compare the
//! kernels against.

#![allow(dead_code)]

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    /// Create a new LCG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next u64 value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Generate a uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform f64 in [lo, hi).
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Generate a uniform usize in [0, n).
    pub fn next_below(&mut self, n: usize) -> usize {
        (self.next_u64() >> 33) as usize % n
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Random ragged run lengths in `[0, max_len]`.
pub fn random_lengths(examples: usize, max_len: usize, seed: u64) -> Vec<usize> {
    let mut rng = Lcg::new(seed);
    (0..examples).map(|_| rng.next_below(max_len + 1)).collect()
}

/// Random f64 values in [-1, 1).
pub fn random_values(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| rng.next_f64_range(-1.0, 1.0)).collect()
}

/// Random f32 values in [-1, 1).
pub fn random_values_f32(n: usize, seed: u64) -> Vec<f32> {
    random_values(n, seed).into_iter().map(|v| v as f32).collect()
}

/// Random 1-based word indices in `[1, vocab]`, encoded as floats.
pub fn random_indices(n: usize, vocab: usize, seed: u64) -> Vec<f32> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| (rng.next_below(vocab) + 1) as f32).collect()
}

/// Random `(index, weight)` pairs with weights in [0.1, 2).
pub fn random_pairs(n: usize, vocab: usize, seed: u64) -> Vec<f32> {
    let mut rng = Lcg::new(seed);
    let mut out = Vec::with_capacity(2 * n);
    for _ in 0..n {
        out.push((rng.next_below(vocab) + 1) as f32);
        out.push(rng.next_f64_range(0.1, 2.0) as f32);
    }
    out
}

/// Random non-negative document frequencies.
pub fn random_freqs(vocab: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..vocab).map(|_| rng.next_f64_range(0.0, 500.0).floor()).collect()
}

// ---------------------------------------------------------------------------
// Dense references
// ---------------------------------------------------------------------------

/// Per-example sums computed with nested loops over an owned copy.
pub fn reference_segment_sum(data: &[f64], lengths: &[usize], dim: usize) -> Vec<f64> {
    let mut out = vec![0.0; lengths.len() * dim];
    let mut pos = 0;
    for (s, &len) in lengths.iter().enumerate() {
        for _ in 0..len {
            for d in 0..dim {
                out[s * dim + d] += data[pos * dim + d];
            }
            pos += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Floating-point comparison utilities
// ---------------------------------------------------------------------------

/// Compute the L2 norm of a vector.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Dot product accumulated in f64.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Odd-offset weights of an interleaved pair buffer, widened to f64.
pub fn pair_weights(pairs: &[f32]) -> Vec<f64> {
    pairs.chunks_exact(2).map(|p| p[1] as f64).collect()
}
