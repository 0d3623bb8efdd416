//! Coefficients keyed by feature identity
//!
//! A [`CoefficientSet`] holds the bias (`offset`), single-feature and
//! pairwise coefficients of one classifier keyed by base-feature identity,
//! so that classifiers trained over different feature lists can be
//! combined.

use crate::features::{Feature, FeatureIndices};
use std::collections::BTreeMap;

/// Bias plus single and pairwise coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientSet<K: Ord + Clone> {
    pub offset: f64,
    singles: BTreeMap<K, f64>,
    pairs: BTreeMap<(K, K), f64>,
}

impl<K: Ord + Clone> Default for CoefficientSet<K> {
    fn default() -> Self {
        Self {
            offset: 0.0,
            singles: BTreeMap::new(),
            pairs: BTreeMap::new(),
        }
    }
}

fn ordered<K: Ord + Clone>(a: &K, b: &K) -> (K, K) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Keep the value with the larger (`larger = true`) or smaller magnitude.
fn pick(a: f64, b: f64, larger: bool) -> f64 {
    if (b.abs() > a.abs()) == larger && b.abs() != a.abs() {
        b
    } else {
        a
    }
}

impl<K: Ord + Clone> CoefficientSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coefficients of a classifier over `features`, keyed through `key`.
    pub fn from_model(
        features: &FeatureIndices,
        theta: &[f64],
        key: impl Fn(usize) -> K,
    ) -> Self {
        assert_eq!(theta.len(), features.len() + 1, "theta not aligned to features");
        let mut set = Self::new();
        set.offset = theta[0];
        for (f, &t) in features.iter().zip(&theta[1..]) {
            if f.is_pair() {
                set.add_pair(&key(f.0), &key(f.1), t);
            } else {
                set.add(&key(f.0), t);
            }
        }
        set
    }

    pub fn add(&mut self, key: &K, value: f64) {
        *self.singles.entry(key.clone()).or_insert(0.0) += value;
    }

    pub fn get(&self, key: &K) -> f64 {
        self.singles.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &K, value: f64) {
        self.singles.insert(key.clone(), value);
    }

    pub fn add_pair(&mut self, a: &K, b: &K, value: f64) {
        if a == b {
            return self.add(a, value);
        }
        *self.pairs.entry(ordered(a, b)).or_insert(0.0) += value;
    }

    pub fn get_pair(&self, a: &K, b: &K) -> f64 {
        if a == b {
            return self.get(a);
        }
        self.pairs.get(&ordered(a, b)).copied().unwrap_or(0.0)
    }

    pub fn set_pair(&mut self, a: &K, b: &K, value: f64) {
        if a == b {
            return self.set(a, value);
        }
        self.pairs.insert(ordered(a, b), value);
    }

    /// Number of stored coefficients, bias excluded.
    pub fn len(&self) -> usize {
        self.singles.len() + self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.pairs.is_empty()
    }

    /// Base keys referenced by any coefficient, sorted.
    pub fn base_keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.singles.keys().cloned().collect();
        for (a, b) in self.pairs.keys() {
            keys.push(a.clone());
            keys.push(b.clone());
        }
        keys.sort();
        keys.dedup();
        keys
    }

    /// All `(a, b, value)` entries, singles as `(a, a, value)`.
    pub fn entries(&self) -> impl Iterator<Item = (K, K, f64)> + '_ {
        self.singles
            .iter()
            .map(|(k, v)| (k.clone(), k.clone(), *v))
            .chain(self.pairs.iter().map(|((a, b), v)| (a.clone(), b.clone(), *v)))
    }

    /// Entries sorted by decreasing magnitude.
    pub fn ranked(&self) -> Vec<(K, K, f64)> {
        let mut entries: Vec<(K, K, f64)> = self.entries().collect();
        entries.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));
        entries
    }

    fn merge_with(&mut self, other: &Self, f: impl Fn(f64, f64) -> f64) {
        self.offset = f(self.offset, other.offset);
        let keys: Vec<K> = self
            .singles
            .keys()
            .chain(other.singles.keys())
            .cloned()
            .collect();
        for k in keys {
            let v = f(self.get(&k), other.get(&k));
            self.singles.insert(k, v);
        }
        let keys: Vec<(K, K)> = self.pairs.keys().chain(other.pairs.keys()).cloned().collect();
        for k in keys {
            let v = f(
                self.pairs.get(&k).copied().unwrap_or(0.0),
                other.pairs.get(&k).copied().unwrap_or(0.0),
            );
            self.pairs.insert(k, v);
        }
    }

    pub fn add_all(&mut self, other: &Self) {
        self.merge_with(other, |a, b| a + b);
    }

    /// Keep, per key, the entry with the larger magnitude; absent keys
    /// count as zero.
    pub fn max_all(&mut self, other: &Self) {
        self.merge_with(other, |a, b| pick(a, b, true));
    }

    /// Keep, per key, the entry with the smaller magnitude; absent keys
    /// count as zero.
    pub fn min_all(&mut self, other: &Self) {
        self.merge_with(other, |a, b| pick(a, b, false));
    }

    pub fn div_all(&mut self, c: f64) {
        self.offset /= c;
        self.singles.values_mut().for_each(|v| *v /= c);
        self.pairs.values_mut().for_each(|v| *v /= c);
    }

    /// Arithmetic mean of `sets`, computed as the first set plus the mean
    /// deviation from it so that identical inputs reproduce themselves
    /// exactly.
    pub fn mean_of(sets: &[Self]) -> Self {
        let Some(first) = sets.first() else {
            return Self::new();
        };
        let mut deviation = Self::new();
        for set in &sets[1..] {
            let mut d = set.clone();
            d.merge_with(first, |a, b| a - b);
            deviation.add_all(&d);
        }
        deviation.div_all(sets.len() as f64);
        let mut mean = first.clone();
        mean.add_all(&deviation);
        mean
    }

    /// Drop exact zeros.
    pub fn sparsify(&mut self) {
        self.singles.retain(|_, v| *v != 0.0);
        self.pairs.retain(|_, v| *v != 0.0);
    }

    /// Materialise `(F, θ)` over a universe, mapping keys to base ids with
    /// `index`. Zero coefficients are dropped.
    pub fn to_model<E>(
        &self,
        index: impl Fn(&K) -> Result<usize, E>,
    ) -> Result<(FeatureIndices, Vec<f64>), E> {
        let mut entries: Vec<(Feature, f64)> = Vec::with_capacity(self.len());
        for (a, b, v) in self.entries() {
            if v != 0.0 {
                entries.push((Feature::pair(index(&a)?, index(&b)?), v));
            }
        }
        entries.sort_unstable_by(|x, y| x.0.cmp(&y.0));
        let mut theta = Vec::with_capacity(entries.len() + 1);
        theta.push(self.offset);
        theta.extend(entries.iter().map(|e| e.1));
        let features = FeatureIndices::new(entries.into_iter().map(|e| e.0).collect());
        Ok((features, theta))
    }
}
