//! Logistic regression loss and gradient over sparse samples
//!
//! Evaluates the class-weighted negative log-likelihood
//!
//! ```text
//! loss(θ) = Σ_i w[y_i] · softplus(∓ z_i) + λ‖θ[1:]‖₁ + λ₂/2 ‖θ[1:]‖²
//! ```
//!
//! where `z_i` is the linear score of sample `i`. When a transform is
//! attached, `z_i` is computed on standardised features without
//! densifying the sample: the contribution of implicit zeros is folded
//! into a constant offset `Σ_j θ_j μ_j / σ_j`. When a [`PairIndex`] is
//! attached, samples carry base features and every pairwise product of
//! their non-zero entries contributes through the pair-indexed
//! coefficients.

use crate::constants::{sigmoid, softplus, PARALLEL_PAIR_THRESHOLD};
use crate::pair_index::PairIndex;
use crate::sparse::SparseSample;
use crate::transform::StandardTransform;
use rayon::prelude::*;

#[inline]
fn label_of(x: &SparseSample) -> bool {
    match x.label() {
        Some(y) => y,
        None => panic!("training sample without label"),
    }
}

/// Borrowed view of a parameter vector with its loss configuration.
#[derive(Debug, Clone)]
pub struct LogisticRegression<'a> {
    theta: &'a [f64],
    weights: [f64; 2],
    lambda: f64,
    l2: f64,
    transform: Option<&'a StandardTransform>,
    pairs: Option<PairIndex>,
    offset: f64,
}

impl<'a> LogisticRegression<'a> {
    pub fn new(theta: &'a [f64]) -> Self {
        assert!(!theta.is_empty(), "parameter vector must hold the bias");
        Self {
            theta,
            weights: [1.0, 1.0],
            lambda: 0.0,
            l2: 0.0,
            transform: None,
            pairs: None,
            offset: 0.0,
        }
    }

    /// Class weights `[w0, w1]`.
    pub fn with_weights(mut self, weights: [f64; 2]) -> Self {
        self.weights = weights;
        self
    }

    /// L1 penalty on `θ[1:]`.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// L2 penalty on `θ[1:]`.
    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    /// Standardise features on the fly. The identity transform is ignored.
    pub fn with_transform(mut self, transform: &'a StandardTransform) -> Self {
        if transform.is_identity() {
            self.transform = None;
            self.offset = 0.0;
            return self;
        }
        assert_eq!(
            transform.len(),
            self.theta.len(),
            "transform length differs from parameter vector"
        );
        self.offset = self
            .theta
            .iter()
            .zip(transform.mu().iter().zip(transform.sigma()))
            .skip(1)
            .filter(|(t, _)| **t != 0.0)
            .map(|(t, (m, s))| t * m / s)
            .sum();
        self.transform = Some(transform);
        self
    }

    /// Expand pairwise products of base features.
    pub fn with_pairs(mut self, pairs: PairIndex) -> Self {
        assert_eq!(
            pairs.dim(),
            self.theta.len(),
            "pair index dimension differs from parameter vector"
        );
        self.pairs = Some(pairs);
        self
    }

    pub fn theta(&self) -> &[f64] {
        self.theta
    }

    #[inline]
    fn scale(&self, j: usize) -> f64 {
        match self.transform {
            Some(t) => 1.0 / t.sigma()[j],
            None => 1.0,
        }
    }

    fn pair_sum(&self, pairs: &PairIndex, indices: &[usize], values: &[f64]) -> f64 {
        let row = |a: usize| -> f64 {
            let mut s = 0.0;
            for b in a + 1..indices.len() {
                let k = pairs.index(indices[a] - 1, indices[b] - 1);
                let t = self.theta[k];
                if t != 0.0 {
                    s += t * values[a] * values[b] * self.scale(k);
                }
            }
            s
        };
        if indices.len() > PARALLEL_PAIR_THRESHOLD {
            (0..indices.len()).into_par_iter().map(row).sum()
        } else {
            (0..indices.len()).map(row).sum()
        }
    }

    /// Linear score `z` of one sample.
    pub fn linear(&self, x: &SparseSample) -> f64 {
        let (indices, values) = x.feature_slices();
        let mut z = self.theta[0] - self.offset;
        for (&i, &v) in indices.iter().zip(values) {
            z += self.theta[i] * v * self.scale(i);
        }
        if let Some(pairs) = &self.pairs {
            z += self.pair_sum(pairs, indices, values);
        }
        z
    }

    /// `log p(y | x)`
    pub fn log_pdf(&self, x: &SparseSample, y: bool) -> f64 {
        let z = self.linear(x);
        if y {
            -softplus(-z)
        } else {
            -softplus(z)
        }
    }

    /// `p(y = 1 | x)`
    pub fn predict(&self, x: &SparseSample) -> f64 {
        sigmoid(self.linear(x))
    }

    fn penalty(&self) -> f64 {
        let tail = &self.theta[1..];
        let mut p = 0.0;
        if self.lambda != 0.0 {
            p += self.lambda * tail.iter().map(|t| t.abs()).sum::<f64>();
        }
        if self.l2 != 0.0 {
            p += 0.5 * self.l2 * tail.iter().map(|t| t * t).sum::<f64>();
        }
        p
    }

    /// Weighted negative log-likelihood plus penalties.
    ///
    /// # Panics
    /// Panics if a sample carries no label.
    pub fn loss(&self, data: &[SparseSample]) -> f64 {
        let nll: f64 = data
            .par_iter()
            .map(|x| {
                let y = label_of(x);
                -self.weights[usize::from(y)] * self.log_pdf(x, y)
            })
            .sum();
        nll + self.penalty()
    }

    /// Gradient of [`LogisticRegression::loss`], using `sign(θ_j)` (0 at 0)
    /// as the L1 subgradient.
    pub fn gradient(&self, data: &[SparseSample]) -> Vec<f64> {
        let dim = self.theta.len();
        let (mut g, residual_sum) = data
            .par_iter()
            .fold(
                || (vec![0.0; dim], 0.0),
                |(mut g, mut total), x| {
                    let y = label_of(x);
                    let target = if y { 1.0 } else { 0.0 };
                    let d = self.weights[usize::from(y)] * (self.predict(x) - target);
                    total += d;
                    g[0] += d;
                    let (indices, values) = x.feature_slices();
                    for (&i, &v) in indices.iter().zip(values) {
                        g[i] += d * v * self.scale(i);
                    }
                    if let Some(pairs) = &self.pairs {
                        for a in 0..indices.len() {
                            for b in a + 1..indices.len() {
                                let k = pairs.index(indices[a] - 1, indices[b] - 1);
                                g[k] += d * values[a] * values[b] * self.scale(k);
                            }
                        }
                    }
                    (g, total)
                },
            )
            .reduce(
                || (vec![0.0; dim], 0.0),
                |(mut a, ta), (b, tb)| {
                    a.iter_mut().zip(&b).for_each(|(x, y)| *x += y);
                    (a, ta + tb)
                },
            );

        if let Some(t) = self.transform {
            for j in 1..dim {
                let m = t.mu()[j];
                if m != 0.0 {
                    g[j] -= m / t.sigma()[j] * residual_sum;
                }
            }
        }
        for j in 1..dim {
            let theta = self.theta[j];
            if self.lambda != 0.0 && theta != 0.0 {
                g[j] += self.lambda * theta.signum();
            }
            if self.l2 != 0.0 {
                g[j] += self.l2 * theta;
            }
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Vec<SparseSample> {
        vec![
            SparseSample::new(vec![(1, 1.0), (2, 2.0)], 3, Some(true)),
            SparseSample::new(vec![(2, 1.0), (3, 3.0)], 3, Some(false)),
            SparseSample::new(vec![(1, 2.0), (3, 1.0)], 3, Some(true)),
            SparseSample::new(vec![(3, 2.0)], 3, Some(false)),
        ]
    }

    fn dense(x: &SparseSample, n: usize) -> Vec<f64> {
        (1..=n).map(|j| x.value(j)).collect()
    }

    fn numeric_gradient(f: impl Fn(&[f64]) -> f64, theta: &[f64]) -> Vec<f64> {
        let h = 1e-6;
        (0..theta.len())
            .map(|j| {
                let mut up = theta.to_vec();
                let mut down = theta.to_vec();
                up[j] += h;
                down[j] -= h;
                (f(&up) - f(&down)) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn test_linear_and_predict() {
        let theta = [0.5, 1.0, -1.0, 0.25];
        let lr = LogisticRegression::new(&theta);
        let x = &data()[0];
        assert!((lr.linear(x) - (0.5 + 1.0 - 2.0)).abs() < 1e-12);
        assert!((lr.predict(x) - sigmoid(-0.5)).abs() < 1e-12);
        assert!((lr.log_pdf(x, true) - sigmoid(-0.5).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_transform_matches_dense_standardisation() {
        let data = data();
        let t = StandardTransform::fit(&data, None);
        let theta = [0.1, 0.4, -0.3, 0.7];
        let lr = LogisticRegression::new(&theta).with_transform(&t);
        for x in &data {
            let v = dense(x, 3);
            let expected = theta[0]
                + (1..=3)
                    .map(|j| theta[j] * (v[j - 1] - t.mu()[j]) / t.sigma()[j])
                    .sum::<f64>();
            assert!((lr.linear(x) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let data = data();
        let t = StandardTransform::fit(&data, None);
        let theta = vec![0.2, -0.5, 0.3, 0.9];
        let loss = |th: &[f64]| {
            LogisticRegression::new(th)
                .with_weights([0.5, 2.0])
                .with_l2(0.3)
                .with_transform(&t)
                .loss(&data)
        };
        let g = LogisticRegression::new(&theta)
            .with_weights([0.5, 2.0])
            .with_l2(0.3)
            .with_transform(&t)
            .gradient(&data);
        let numeric = numeric_gradient(loss, &theta);
        for (a, b) in g.iter().zip(&numeric) {
            assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_l1_term() {
        let data = data();
        let theta = [1.0, -2.0, 0.0, 3.0];
        let plain = LogisticRegression::new(&theta);
        let l1 = LogisticRegression::new(&theta).with_lambda(0.5);
        assert!((l1.loss(&data) - plain.loss(&data) - 0.5 * 5.0).abs() < 1e-12);
        let g0 = plain.gradient(&data);
        let g1 = l1.gradient(&data);
        assert!((g1[0] - g0[0]).abs() < 1e-12);
        assert!((g1[1] - g0[1] + 0.5).abs() < 1e-12);
        assert!((g1[2] - g0[2]).abs() < 1e-12);
        assert!((g1[3] - g0[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pairs_match_explicit_products() {
        use crate::encoder::CountEncoder;
        use crate::features::FeatureIndices;

        let data = data();
        let pairs = PairIndex::new(3);
        let theta: Vec<f64> = (0..pairs.dim()).map(|k| 0.1 * k as f64 - 0.2).collect();

        // explicit encoding over all singles and pairs in full-index order
        let features: Vec<_> = (1..pairs.dim())
            .map(|k| crate::features::Feature::from_full_index(&pairs, k))
            .collect();
        let list = FeatureIndices::new(features);
        let enc = CountEncoder::new(list.clone(), 3).unwrap();
        let mut reordered = vec![theta[0]];
        for f in list.iter() {
            reordered.push(theta[f.full_index(&pairs)]);
        }

        let implicit = LogisticRegression::new(&theta).with_pairs(pairs);
        let explicit = LogisticRegression::new(&reordered);
        let encoded: Vec<SparseSample> = data
            .iter()
            .map(|x| enc.encode(&x.counts(), x.label()).unwrap())
            .collect();
        for (x, e) in data.iter().zip(&encoded) {
            assert!((implicit.linear(x) - explicit.linear(e)).abs() < 1e-12);
        }
        assert!((implicit.loss(&data) - explicit.loss(&encoded)).abs() < 1e-10);

        let gi = implicit.gradient(&data);
        let ge = explicit.gradient(&encoded);
        for (p, f) in list.iter().enumerate() {
            assert!((gi[f.full_index(&pairs)] - ge[p + 1]).abs() < 1e-10);
        }
    }
}
