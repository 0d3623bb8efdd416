//! Per-feature standardisation
//!
//! A [`StandardTransform`] stores `mu` and `sigma` for every coefficient
//! slot, slot 0 (bias) always being `(0, 1)`. An empty transform is the
//! identity. Transforms are fit once on the training data and applied on
//! the fly by the optimiser, so encoded samples stay sparse.

use crate::combine::IncompatibleError;
use crate::constants::TRANSFORM_TOLERANCE;
use crate::features::FeatureKey;
use crate::pair_index::PairIndex;
use crate::sparse::SparseSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-slot mean and standard deviation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StandardTransform {
    mu: Vec<f64>,
    sigma: Vec<f64>,
}

impl StandardTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from explicit vectors.
    ///
    /// # Panics
    /// Panics if the lengths differ.
    pub fn from_parts(mu: Vec<f64>, sigma: Vec<f64>) -> Self {
        assert_eq!(mu.len(), sigma.len(), "mu and sigma lengths differ");
        Self { mu, sigma }
    }

    pub fn is_identity(&self) -> bool {
        self.mu.is_empty()
    }

    /// Number of slots (0 for the identity).
    pub fn len(&self) -> usize {
        self.mu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    /// Fit on `samples`.
    ///
    /// Without `pairs`, slots follow the samples' own feature positions.
    /// With `pairs`, samples hold base features and statistics are also
    /// collected for every pairwise product, indexed through `pairs`.
    /// Variances are population variances including implicit zeros.
    pub fn fit(samples: &[SparseSample], pairs: Option<&PairIndex>) -> Self {
        let dim = match (pairs, samples.first()) {
            (Some(p), _) => p.dim(),
            (None, Some(x)) => x.n_features() + 1,
            (None, None) => return Self::identity(),
        };
        let n = samples.len() as f64;
        if samples.is_empty() {
            return Self {
                mu: vec![0.0; dim],
                sigma: vec![1.0; dim],
            };
        }

        // pass 1: sums and non-zero counts
        let mut sums = vec![0.0; dim];
        let mut nonzero = vec![0usize; dim];
        for x in samples {
            let (indices, values) = x.feature_slices();
            for (&i, &v) in indices.iter().zip(values) {
                sums[i] += v;
                nonzero[i] += 1;
            }
            if let Some(p) = pairs {
                for a in 0..indices.len() {
                    for b in a + 1..indices.len() {
                        let k = p.index(indices[a] - 1, indices[b] - 1);
                        sums[k] += values[a] * values[b];
                        nonzero[k] += 1;
                    }
                }
            }
        }
        let mut mu: Vec<f64> = sums.iter().map(|s| s / n).collect();
        mu[0] = 0.0;

        // pass 2: squared deviations over stored entries
        let mut squares = vec![0.0; dim];
        for x in samples {
            let (indices, values) = x.feature_slices();
            for (&i, &v) in indices.iter().zip(values) {
                squares[i] += (v - mu[i]).powi(2);
            }
            if let Some(p) = pairs {
                for a in 0..indices.len() {
                    for b in a + 1..indices.len() {
                        let k = p.index(indices[a] - 1, indices[b] - 1);
                        squares[k] += (values[a] * values[b] - mu[k]).powi(2);
                    }
                }
            }
        }

        let sigma = squares
            .iter()
            .zip(&nonzero)
            .zip(&mu)
            .enumerate()
            .map(|(j, ((s, &k), m))| {
                if j == 0 {
                    return 1.0;
                }
                // implicit zeros each contribute mu^2
                let var = (s + (n - k as f64) * m * m) / n;
                if var > 0.0 {
                    var.sqrt()
                } else {
                    1.0
                }
            })
            .collect();
        Self { mu, sigma }
    }

    /// `(value - mu[j]) / sigma[j]`
    #[inline]
    pub fn apply(&self, value: f64, j: usize) -> f64 {
        if self.is_identity() {
            value
        } else {
            (value - self.mu[j]) / self.sigma[j]
        }
    }

    /// Keep the slots where `mask` is true.
    pub fn select(&self, mask: &[bool]) -> Self {
        if self.is_identity() {
            return Self::identity();
        }
        assert_eq!(mask.len(), self.len(), "mask length differs from transform");
        let slots: Vec<usize> = (0..mask.len()).filter(|&j| mask[j]).collect();
        self.gather(&slots)
    }

    /// Transform over the listed slots, in order.
    pub fn gather(&self, slots: &[usize]) -> Self {
        if self.is_identity() {
            return Self::identity();
        }
        Self {
            mu: slots.iter().map(|&j| self.mu[j]).collect(),
            sigma: slots.iter().map(|&j| self.sigma[j]).collect(),
        }
    }

    /// Merge transforms of several classifiers onto `target` features.
    ///
    /// Each part pairs a transform with the identities of its features
    /// (slot `p+1` belongs to `keys[p]`). Features present in several parts
    /// must agree within tolerance.
    pub fn merge(
        parts: &[(&StandardTransform, &[FeatureKey])],
        target: &[FeatureKey],
    ) -> Result<Self, IncompatibleError> {
        let identities = parts.iter().filter(|(t, _)| t.is_identity()).count();
        if identities == parts.len() {
            return Ok(Self::identity());
        }
        if identities > 0 {
            return Err(IncompatibleError::Transform(
                "cannot merge standardised and unstandardised classifiers".to_string(),
            ));
        }

        let mut known: BTreeMap<FeatureKey, (f64, f64)> = BTreeMap::new();
        for (transform, keys) in parts {
            assert_eq!(transform.len(), keys.len() + 1, "transform not aligned to features");
            for (p, key) in keys.iter().enumerate() {
                let entry = (transform.mu[p + 1], transform.sigma[p + 1]);
                match known.get(key) {
                    Some(&(mu, sigma)) => {
                        if (mu - entry.0).abs() > TRANSFORM_TOLERANCE
                            || (sigma - entry.1).abs() > TRANSFORM_TOLERANCE
                        {
                            return Err(IncompatibleError::Transform(format!(
                                "feature {:?} has mu/sigma ({}, {}) and ({}, {})",
                                key, mu, sigma, entry.0, entry.1
                            )));
                        }
                    }
                    None => {
                        known.insert(*key, entry);
                    }
                }
            }
        }

        let mut mu = Vec::with_capacity(target.len() + 1);
        let mut sigma = Vec::with_capacity(target.len() + 1);
        mu.push(0.0);
        sigma.push(1.0);
        for key in target {
            let (m, s) = known.get(key).copied().ok_or_else(|| {
                IncompatibleError::Transform(format!("no statistics for feature {:?}", key))
            })?;
            mu.push(m);
            sigma.push(s);
        }
        Ok(Self { mu, sigma })
    }

    /// Equality within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.len() == other.len()
            && self
                .mu
                .iter()
                .zip(&other.mu)
                .chain(self.sigma.iter().zip(&other.sigma))
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}
