//! Working-set selection for the outer training loop
//!
//! Each outer iteration the selector restores the current classifier into
//! the full coefficient space (all base features, plus all pairs when
//! co-occurrence is on), evaluates the unregularised gradient there and
//! decides which coefficients the next sub-problem may use.
//!
//! In automatic mode the working set is grown towards a target number of
//! non-zero coefficients `N` and `λ` is placed halfway between the `N`-th
//! largest absolute gradient and the next smaller one. In fixed mode every
//! coefficient whose gradient reaches `λ` is admitted.

use crate::encoder::CountEncoder;
use crate::features::{Feature, FeatureIndices};
use crate::io::DataError;
use crate::logreg::LogisticRegression;
use crate::pair_index::PairIndex;
use crate::sparse::SparseSample;
use crate::training::TrainingContext;
use crate::transform::StandardTransform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How the regularisation strength is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Aim for `target` non-zero coefficients
    Auto { target: usize },
    /// Use `lambda`, admitting at most `max_features` coefficients
    Fixed {
        lambda: f64,
        max_features: Option<usize>,
    },
}

impl SelectionMode {
    pub fn target(&self) -> Option<usize> {
        match self {
            SelectionMode::Auto { target } => Some(*target),
            SelectionMode::Fixed { .. } => None,
        }
    }
}

/// Result of one selection step
#[derive(Debug, Clone)]
pub struct Selection {
    /// Working set for the next sub-problem
    pub features: FeatureIndices,
    /// Warm start aligned to `features`
    pub theta: Vec<f64>,
    /// Full transform restricted to `features`
    pub transform: StandardTransform,
    pub lambda: f64,
    /// Coefficients that entered the working set in this step
    pub admitted: usize,
    /// The outer loop should stop; the previous classifier stands
    pub done: bool,
}

/// Chooses working sets over a universe of `n_base` base features.
#[derive(Debug, Clone)]
pub struct FeatureSelector<'a> {
    mode: SelectionMode,
    n_base: usize,
    pairs: Option<PairIndex>,
    weights: [f64; 2],
    /// Transform over the full coefficient space (or identity)
    transform: &'a StandardTransform,
    epsilon_lambda: f64,
}

/// Descending by magnitude, ties by index.
fn by_magnitude(g: &[f64]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |a, b| g[*b].abs().total_cmp(&g[*a].abs()).then(a.cmp(b))
}

/// Indices `j ≥ 1` with `|g_j| ≥ min_abs` and `g_j ≠ 0`, largest first,
/// at most `limit` of them.
fn rank(g: &[f64], limit: usize, min_abs: f64) -> Vec<usize> {
    let mut candidates: Vec<usize> = (1..g.len())
        .filter(|&j| g[j] != 0.0 && g[j].is_finite() && g[j].abs() >= min_abs)
        .collect();
    if limit == 0 {
        return Vec::new();
    }
    if candidates.len() > limit {
        candidates.select_nth_unstable_by(limit - 1, by_magnitude(g));
        candidates.truncate(limit);
    }
    candidates.sort_unstable_by(by_magnitude(g));
    candidates
}

impl<'a> FeatureSelector<'a> {
    pub fn new(mode: SelectionMode, n_base: usize, transform: &'a StandardTransform) -> Self {
        Self {
            mode,
            n_base,
            pairs: None,
            weights: [1.0, 1.0],
            transform,
            epsilon_lambda: 0.0,
        }
    }

    /// Include all pairwise co-occurrences of base features.
    pub fn with_cooccurrence(mut self, cooccurrence: bool) -> Self {
        self.pairs = cooccurrence.then(|| PairIndex::new(self.n_base));
        self
    }

    pub fn with_weights(mut self, weights: [f64; 2]) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_epsilon_lambda(mut self, epsilon_lambda: f64) -> Self {
        self.epsilon_lambda = epsilon_lambda;
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn n_base(&self) -> usize {
        self.n_base
    }

    /// Length of the full parameter vector.
    pub fn dim(&self) -> usize {
        match &self.pairs {
            Some(p) => p.dim(),
            None => self.n_base + 1,
        }
    }

    fn full_index(&self, feature: Feature) -> usize {
        match &self.pairs {
            Some(p) => feature.full_index(p),
            None => {
                assert!(!feature.is_pair(), "pair feature {} without co-occurrence", feature);
                feature.0 + 1
            }
        }
    }

    fn feature_at(&self, index: usize) -> Feature {
        match &self.pairs {
            Some(p) => Feature::from_full_index(p, index),
            None => Feature::single(index - 1),
        }
    }

    /// Scatter the non-zero coefficients of `theta` into the full space.
    /// Returns the full vector and the positions set.
    fn restore(&self, features: &FeatureIndices, theta: &[f64]) -> (Vec<f64>, Vec<usize>) {
        assert_eq!(theta.len(), features.len() + 1, "theta not aligned to features");
        let mut full = vec![0.0; self.dim()];
        full[0] = theta[0];
        let mut active = Vec::new();
        for (f, &t) in features.iter().zip(&theta[1..]) {
            if t != 0.0 {
                let k = self.full_index(*f);
                full[k] = t;
                active.push(k);
            }
        }
        (full, active)
    }

    /// Unregularised gradient over the full coefficient space.
    pub fn full_gradient(
        &self,
        ctx: &TrainingContext,
        data: &[SparseSample],
        theta_full: &[f64],
    ) -> Vec<f64> {
        ctx.pool_lr().install(|| {
            let mut model = LogisticRegression::new(theta_full)
                .with_weights(self.weights)
                .with_transform(self.transform);
            if let Some(p) = self.pairs {
                model = model.with_pairs(p);
            }
            model.gradient(data)
        })
    }

    /// Choose the next working set.
    ///
    /// `data` holds labelled samples over the base features (position
    /// `id + 1`); `features`/`theta` is the current classifier and
    /// `lambda_prev` the λ it was trained with.
    pub fn select(
        &self,
        ctx: &TrainingContext,
        data: &[SparseSample],
        features: &FeatureIndices,
        theta: &[f64],
        lambda_prev: Option<f64>,
        has_classifier: bool,
    ) -> Selection {
        let (mut theta_full, mut active) = self.restore(features, theta);
        let g = self.full_gradient(ctx, data, &theta_full);
        let mut mask = vec![false; theta_full.len()];
        for &k in &active {
            mask[k] = true;
        }

        let mut admitted = 0;
        let mut pruned = false;
        let lambda = match self.mode {
            SelectionMode::Auto { target } => {
                let ranked = rank(&g, 2 * target, 0.0);
                for &j in &ranked {
                    if active.len() >= target {
                        break;
                    }
                    if !mask[j] {
                        mask[j] = true;
                        active.push(j);
                        admitted += 1;
                    }
                }
                // previously used coefficients fill remaining capacity
                for f in features {
                    if active.len() >= target {
                        break;
                    }
                    let k = self.full_index(*f);
                    if !mask[k] {
                        mask[k] = true;
                        active.push(k);
                    }
                }
                if active.len() > target {
                    active.sort_unstable_by(by_magnitude(&theta_full));
                    for &k in &active[target..] {
                        mask[k] = false;
                        theta_full[k] = 0.0;
                    }
                    active.truncate(target);
                    pruned = true;
                }

                let last = target.min(ranked.len());
                let mut lambda = if last == 0 {
                    0.0
                } else {
                    let a = g[ranked[last - 1]].abs();
                    let b = ranked
                        .iter()
                        .map(|&k| g[k].abs())
                        .find(|&v| v < a)
                        .unwrap_or(0.0);
                    (a + b) / 2.0
                };
                if admitted > 0 {
                    if let Some(prev) = lambda_prev {
                        lambda = lambda.min(prev);
                    }
                }
                lambda
            }
            SelectionMode::Fixed {
                lambda,
                max_features,
            } => {
                let cap = max_features.unwrap_or(usize::MAX);
                for j in rank(&g, usize::MAX, lambda) {
                    if active.len() >= cap {
                        break;
                    }
                    if !mask[j] {
                        mask[j] = true;
                        active.push(j);
                        admitted += 1;
                    }
                }
                lambda
            }
        };

        let settled = match (self.epsilon_lambda > 0.0, lambda_prev) {
            (false, _) => true,
            (true, Some(prev)) => (lambda - prev).abs() < self.epsilon_lambda,
            (true, None) => false,
        };
        let done = admitted == 0 && !pruned && has_classifier && settled;

        let mut slots: Vec<(Feature, usize)> =
            active.iter().map(|&k| (self.feature_at(k), k)).collect();
        slots.sort_unstable();
        let mut theta_next = Vec::with_capacity(slots.len() + 1);
        theta_next.push(theta_full[0]);
        theta_next.extend(slots.iter().map(|&(_, k)| theta_full[k]));
        let mut gather = Vec::with_capacity(slots.len() + 1);
        gather.push(0);
        gather.extend(slots.iter().map(|&(_, k)| k));

        log::debug!(
            "selection: {} active, {} admitted, lambda {:.6e}{}",
            slots.len(),
            admitted,
            lambda,
            if done { " (done)" } else { "" }
        );

        Selection {
            features: FeatureIndices::new(slots.into_iter().map(|(f, _)| f).collect()),
            theta: theta_next,
            transform: self.transform.gather(&gather),
            lambda,
            admitted,
            done,
        }
    }

    /// Encode base samples over the working set `features`.
    pub fn reduce(
        &self,
        ctx: &TrainingContext,
        data: &[SparseSample],
        features: &FeatureIndices,
    ) -> Result<Vec<SparseSample>, DataError> {
        let encoder = CountEncoder::new(features.clone(), self.n_base)?;
        ctx.pool_lr().install(|| {
            data.par_iter()
                .map(|x| encoder.encode(&x.counts(), x.label()))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::labelled_samples;

    fn ctx() -> TrainingContext {
        TrainingContext::single_threaded().unwrap()
    }

    #[test]
    fn test_rank_orders_by_magnitude() {
        let g = [9.0, 0.5, -3.0, 0.0, 3.0, -1.0];
        assert_eq!(rank(&g, 10, 0.0), vec![2, 4, 5, 1]);
        assert_eq!(rank(&g, 2, 0.0), vec![2, 4]);
        assert_eq!(rank(&g, 10, 1.0), vec![2, 4, 5]);
        assert!(rank(&g, 0, 0.0).is_empty());
    }

    #[test]
    fn test_auto_first_step_admits_target() {
        let data = labelled_samples(60, 6, 3);
        let transform = StandardTransform::fit(&data, None);
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 2 }, 6, &transform);
        let sel = selector.select(&ctx(), &data, &FeatureIndices::default(), &[0.0], None, false);
        assert_eq!(sel.admitted, 2);
        assert_eq!(sel.features.len(), 2);
        assert_eq!(sel.theta.len(), 3);
        assert_eq!(sel.transform.len(), 3);
        assert!(sel.lambda > 0.0);
        assert!(!sel.done);
        // the informative feature has the largest gradient
        assert!(sel.features.position(Feature::single(0)).is_some());
    }

    #[test]
    fn test_lambda_lies_between_order_statistics() {
        let data = labelled_samples(50, 5, 8);
        let transform = StandardTransform::identity();
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 1 }, 5, &transform);
        let theta_full = vec![0.0; 6];
        let g = selector.full_gradient(&ctx(), &data, &theta_full);
        let mut mags: Vec<f64> = g[1..].iter().map(|v| v.abs()).collect();
        mags.sort_by(|a, b| b.total_cmp(a));
        let sel = selector.select(&ctx(), &data, &FeatureIndices::default(), &[0.0], None, false);
        assert!(sel.lambda <= mags[0] && sel.lambda >= mags[1]);
    }

    #[test]
    fn test_selection_support_matches_theta() {
        let data = labelled_samples(40, 4, 1);
        let transform = StandardTransform::fit(&data, None);
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 3 }, 4, &transform);
        let features = FeatureIndices::new(vec![Feature::single(0), Feature::single(2)]);
        // the zero coefficient of feature 2 is not restored as active
        let sel = selector.select(&ctx(), &data, &features, &[0.1, 0.8, 0.0], Some(1.0), true);
        assert_eq!(sel.features.len(), sel.theta.len() - 1);
        assert!(sel.features.len() <= 3);
        let p = sel.features.position(Feature::single(0)).unwrap();
        assert_eq!(sel.theta[p], 0.8);
        assert_eq!(sel.theta[0], 0.1);
        assert!(sel.lambda <= 1.0);
    }

    #[test]
    fn test_overfull_working_set_is_pruned() {
        let data = labelled_samples(40, 4, 2);
        let transform = StandardTransform::identity();
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 1 }, 4, &transform);
        let features = FeatureIndices::diagonal(3);
        let sel = selector.select(&ctx(), &data, &features, &[0.0, 0.2, -0.9, 0.1], Some(1.0), true);
        assert_eq!(sel.features.as_slice(), &[Feature::single(1)]);
        assert_eq!(sel.theta, vec![0.0, -0.9]);
        assert!(!sel.done);
    }

    #[test]
    fn test_fixed_lambda_admission() {
        let data = labelled_samples(40, 5, 4);
        let transform = StandardTransform::identity();
        let huge = FeatureSelector::new(
            SelectionMode::Fixed {
                lambda: 1e9,
                max_features: None,
            },
            5,
            &transform,
        );
        let sel = huge.select(&ctx(), &data, &FeatureIndices::default(), &[0.0], Some(1e9), true);
        assert_eq!(sel.admitted, 0);
        assert!(sel.features.is_empty());
        assert!(sel.done);

        let capped = FeatureSelector::new(
            SelectionMode::Fixed {
                lambda: 0.0,
                max_features: Some(2),
            },
            5,
            &transform,
        );
        let sel = capped.select(&ctx(), &data, &FeatureIndices::default(), &[0.0], None, false);
        assert_eq!(sel.admitted, 2);
    }

    #[test]
    fn test_cooccurrence_selection_and_reduction() {
        let data = labelled_samples(40, 3, 6);
        let pairs = PairIndex::new(3);
        let transform = StandardTransform::fit(&data, Some(&pairs));
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 4 }, 3, &transform)
            .with_cooccurrence(true);
        assert_eq!(selector.dim(), 7);
        let sel = selector.select(&ctx(), &data, &FeatureIndices::default(), &[0.0], None, false);
        assert_eq!(sel.features.len(), 4);
        assert_eq!(sel.transform.len(), 5);
        for (p, f) in sel.features.iter().enumerate() {
            let k = f.full_index(&pairs);
            assert_eq!(sel.transform.mu()[p + 1], transform.mu()[k]);
        }
        let reduced = selector.reduce(&ctx(), &data, &sel.features).unwrap();
        assert_eq!(reduced.len(), data.len());
        for (x, r) in data.iter().zip(&reduced) {
            assert_eq!(r.label(), x.label());
            for (p, f) in sel.features.iter().enumerate() {
                let expected = if f.is_pair() {
                    x.value(f.0 + 1) * x.value(f.1 + 1)
                } else {
                    x.value(f.0 + 1)
                };
                assert_eq!(r.value(p + 1), expected);
            }
        }
    }

    #[test]
    fn test_epsilon_lambda_delays_stop() {
        let data = labelled_samples(30, 3, 9);
        let transform = StandardTransform::identity();
        let selector = FeatureSelector::new(SelectionMode::Auto { target: 3 }, 3, &transform)
            .with_epsilon_lambda(1e-12);
        let features = FeatureIndices::diagonal(3);
        let sel = selector.select(&ctx(), &data, &features, &[0.0, 0.5, -0.5, 0.5], Some(123.0), true);
        assert_eq!(sel.admitted, 0);
        assert!(!sel.done);
    }
}
