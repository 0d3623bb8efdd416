//! Coefficient numbering for single and pairwise features
//!
//! Over a universe of `n` base features, coefficient `0` is the bias,
//! coefficients `1..=n` are the single features `(i,i)` and the pairs
//! `(i,j), i<j` follow in row-major upper-triangular order. Pair
//! coefficients are therefore addressable without materialising them.

/// Bijection between coefficient indices and unordered feature pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairIndex {
    n: usize,
}

impl PairIndex {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Number of base features.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of coefficients excluding the bias: `n + n(n-1)/2`.
    pub fn len(&self) -> usize {
        self.n + self.n * self.n.saturating_sub(1) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Parameter vector length including the bias.
    pub fn dim(&self) -> usize {
        self.len() + 1
    }

    /// Number of off-diagonal coefficients in rows before `i`.
    fn row_start(&self, i: usize) -> usize {
        i * self.n - i * (i + 1) / 2
    }

    /// Coefficient index (1-based, bias excluded) of the pair `(k1, k2)`.
    ///
    /// # Panics
    /// Panics unless `k1 <= k2 < n`.
    pub fn index(&self, k1: usize, k2: usize) -> usize {
        assert!(
            k1 <= k2 && k2 < self.n,
            "pair ({}, {}) invalid for {} base features",
            k1,
            k2,
            self.n
        );
        if k1 == k2 {
            k1 + 1
        } else {
            self.n + self.row_start(k1) + (k2 - k1 - 1) + 1
        }
    }

    /// Pair `(k1, k2)` of the 0-based coefficient offset `k` (i.e. the
    /// coefficient at index `k + 1`).
    pub fn pair(&self, k: usize) -> (usize, usize) {
        assert!(k < self.len(), "coefficient {} out of range", k);
        if k < self.n {
            return (k, k);
        }
        let r = k - self.n;
        // largest row i with row_start(i) <= r, from the quadratic estimate
        let b = 2.0 * self.n as f64 - 1.0;
        let disc = (b * b - 8.0 * r as f64).max(0.0);
        let mut i = ((b - disc.sqrt()) / 2.0).floor().max(0.0) as usize;
        i = i.min(self.n - 2);
        while i > 0 && self.row_start(i) > r {
            i -= 1;
        }
        while i + 2 < self.n && self.row_start(i + 1) <= r {
            i += 1;
        }
        let j = i + 1 + (r - self.row_start(i));
        assert_eq!(self.index(i, j), k + 1, "pair index inverse mismatch");
        (i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_layout() {
        let pi = PairIndex::new(3);
        assert_eq!(pi.len(), 6);
        assert_eq!(pi.dim(), 7);
        assert_eq!(pi.index(0, 0), 1);
        assert_eq!(pi.index(2, 2), 3);
        assert_eq!(pi.index(0, 1), 4);
        assert_eq!(pi.index(0, 2), 5);
        assert_eq!(pi.index(1, 2), 6);
    }

    #[test]
    fn test_inverse_roundtrip() {
        for n in [1usize, 2, 3, 7, 50, 257] {
            let pi = PairIndex::new(n);
            let mut expected = 1;
            for i in 0..n {
                assert_eq!(pi.pair(pi.index(i, i) - 1), (i, i));
            }
            for i in 0..n {
                for j in i..n {
                    assert_eq!(pi.pair(pi.index(i, j) - 1), (i, j));
                }
            }
            // indices cover 1..=len exactly once
            let mut seen = vec![false; pi.len() + 1];
            for i in 0..n {
                for j in i..n {
                    let k = pi.index(i, j);
                    assert!(!seen[k]);
                    seen[k] = true;
                }
            }
            assert!(seen[1..].iter().all(|&s| s));
            expected += pi.len();
            assert_eq!(expected, pi.dim());
        }
    }

    #[test]
    fn test_monotone_within_band() {
        let pi = PairIndex::new(20);
        for i in 0..19 {
            for j in (i + 1)..19 {
                assert!(pi.index(i, j) < pi.index(i, j + 1));
            }
        }
        for i in 0..19 {
            assert!(pi.index(i, i) < pi.index(i + 1, i + 1));
        }
    }

    #[test]
    #[should_panic]
    fn test_out_of_range() {
        PairIndex::new(3).index(1, 3);
    }
}
