//! Sparse symmetric curvature accumulation.
//!
//! Per-bin/per-event gradients are sparse: a bin depends on the handful of
//! parameters of the models overlapping it. The accumulator therefore folds
//! outer-product updates restricted to each contribution's nonzero index
//! set; a dense O(n²) update per bin would be prohibitive with thousands of
//! parameters and millions of bins.
//!
//! Only the upper triangle is stored. The matrix is symmetric by
//! construction, since every contribution is the outer product of a vector
//! with itself; dense extraction mirrors entries exactly.

use nalgebra::DMatrix;
use std::collections::HashMap;

/// Incrementally built sparse symmetric matrix.
///
/// Entries never touched by an update are implicitly zero. Worker-local
/// accumulators produced by parallel per-observation evaluation are
/// combined with [`merge`](CurvatureAccumulator::merge).
#[derive(Debug, Clone, Default)]
pub struct CurvatureAccumulator {
    n: usize,
    entries: HashMap<(u32, u32), f64>,
}

impl CurvatureAccumulator {
    /// Zero state sized for `n` parameters.
    pub fn new(n: usize) -> Self {
        Self { n, entries: HashMap::new() }
    }

    /// Zero state sized for `n` parameters, with capacity reserved for an
    /// estimated number of nonzero entries.
    pub fn with_estimate(n: usize, nnz_estimate: usize) -> Self {
        Self { n, entries: HashMap::with_capacity(nnz_estimate) }
    }

    /// Reset to zero state sized for `n` parameters, keeping capacity.
    pub fn reset(&mut self, n: usize) {
        self.n = n;
        self.entries.clear();
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of explicitly stored (touched) entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Add `scale * values[a] * values[b]` at `(indices[a], indices[b])`
    /// for every pair in the active set.
    ///
    /// `indices` must contain distinct parameter indices below the matrix
    /// dimension; `values` holds the matching partial derivatives.
    pub fn add_outer(&mut self, indices: &[usize], values: &[f64], scale: f64) {
        debug_assert_eq!(indices.len(), values.len());
        for (a, (&ia, &va)) in indices.iter().zip(values).enumerate() {
            debug_assert!(ia < self.n);
            let sa = scale * va;
            for (&ib, &vb) in indices[a..].iter().zip(&values[a..]) {
                let key = if ia <= ib { (ia as u32, ib as u32) } else { (ib as u32, ia as u32) };
                *self.entries.entry(key).or_insert(0.0) += sa * vb;
            }
        }
    }

    /// Add `value` on the diagonal at `(index, index)`, the degenerate
    /// single-nonzero-partial case.
    pub fn add_diag(&mut self, index: usize, value: f64) {
        debug_assert!(index < self.n);
        *self.entries.entry((index as u32, index as u32)).or_insert(0.0) += value;
    }

    /// Fold another accumulator of the same dimension into this one.
    pub fn merge(&mut self, other: CurvatureAccumulator) {
        debug_assert_eq!(self.n, other.n);
        if self.entries.is_empty() {
            self.entries = other.entries;
            return;
        }
        for (key, value) in other.entries {
            *self.entries.entry(key).or_insert(0.0) += value;
        }
    }

    /// Extract the dense symmetric matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n, self.n);
        for (&(i, j), &value) in &self.entries {
            let (i, j) = (i as usize, j as usize);
            dense[(i, j)] = value;
            if i != j {
                dense[(j, i)] = value;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_outer_product_accumulation() {
        let mut acc = CurvatureAccumulator::new(4);
        acc.add_outer(&[1, 3], &[2.0, -1.0], 0.5);
        let dense = acc.to_dense();
        assert_relative_eq!(dense[(1, 1)], 2.0, epsilon = 1e-15);
        assert_relative_eq!(dense[(1, 3)], -1.0, epsilon = 1e-15);
        assert_relative_eq!(dense[(3, 3)], 0.5, epsilon = 1e-15);
        assert_eq!(dense[(0, 0)], 0.0);
        assert_eq!(acc.nnz(), 3);
    }

    #[test]
    fn test_symmetry_is_exact() {
        let mut acc = CurvatureAccumulator::new(5);
        acc.add_outer(&[4, 0, 2], &[0.3, 1.7, -2.2], 1.3);
        acc.add_outer(&[2, 1], &[0.9, 0.1], 0.7);
        acc.add_diag(3, 4.0);
        let dense = acc.to_dense();
        for i in 0..5 {
            for j in 0..5 {
                // Bitwise equality: both triangle entries come from the
                // same stored value.
                assert_eq!(dense[(i, j)].to_bits(), dense[(j, i)].to_bits());
            }
        }
    }

    #[test]
    fn test_untouched_entries_stay_implicitly_zero() {
        let mut acc = CurvatureAccumulator::with_estimate(1000, 16);
        acc.add_outer(&[7, 991], &[1.0, 1.0], 1.0);
        assert_eq!(acc.nnz(), 3);
        let dense = acc.to_dense();
        assert_eq!(dense[(500, 500)], 0.0);
        assert_eq!(dense[(7, 991)], 1.0);
    }

    #[test]
    fn test_merge_matches_single_accumulator() {
        let mut whole = CurvatureAccumulator::new(3);
        whole.add_outer(&[0, 1], &[1.0, 2.0], 1.0);
        whole.add_outer(&[1, 2], &[3.0, 4.0], 0.5);

        let mut a = CurvatureAccumulator::new(3);
        a.add_outer(&[0, 1], &[1.0, 2.0], 1.0);
        let mut b = CurvatureAccumulator::new(3);
        b.add_outer(&[1, 2], &[3.0, 4.0], 0.5);
        a.merge(b);

        assert_eq!(whole.to_dense(), a.to_dense());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut acc = CurvatureAccumulator::new(2);
        acc.add_diag(0, 1.0);
        acc.reset(3);
        assert_eq!(acc.dim(), 3);
        assert_eq!(acc.nnz(), 0);
        assert_eq!(acc.to_dense(), DMatrix::zeros(3, 3));
    }
}
