//! Outer selection loop
//!
//! Alternates [`FeatureSelector::select`] and one inner estimate until the
//! selector reports that nothing changes any more, the epoch limit is
//! reached or the run is cancelled. Selection modes are processed in
//! order, each warm-started from the classifier of the previous one.

use super::{TrainError, TrainerConfig, TrainingContext};
use crate::estimator::{make_estimator, ConvergenceHook, Estimator, Problem, StopReason};
use crate::features::{Feature, FeatureIndices};
use crate::io::DataError;
use crate::pair_index::PairIndex;
use crate::selector::{FeatureSelector, SelectionMode};
use crate::sparse::SparseSample;
use crate::trace::Trace;
use crate::transform::StandardTransform;

/// Class weights `[w0, w1]`; balanced weights are `n / (2·n_y)`.
pub fn class_weights(labels: &[bool], balance: bool) -> [f64; 2] {
    if !balance {
        return [1.0, 1.0];
    }
    let n = labels.len() as f64;
    let n1 = labels.iter().filter(|&&y| y).count() as f64;
    let n0 = n - n1;
    let weight = |k: f64| if k > 0.0 { n / (2.0 * k) } else { 1.0 };
    [weight(n0), weight(n1)]
}

/// One accepted `(λ, θ)` of the outer loop
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint {
    pub lambda: f64,
    /// Coefficients that entered the working set in this epoch
    pub admitted: usize,
    /// Non-zero coefficients, bias excluded
    pub coefficients: Vec<(Feature, f64)>,
}

/// Classifier standing at the end of one selection mode
#[derive(Debug, Clone)]
pub struct TrainedClassifier {
    pub mode: SelectionMode,
    pub features: FeatureIndices,
    /// Aligned to `features`, bias first
    pub theta: Vec<f64>,
    pub lambda: f64,
    pub epochs: usize,
    pub iterations: usize,
    pub stop: Option<StopReason>,
    /// Regularised loss of the last estimate, if it was evaluated
    pub loss: Option<f64>,
}

impl TrainedClassifier {
    pub fn nonzero(&self) -> usize {
        self.theta[1..].iter().filter(|t| **t != 0.0).count()
    }

    /// Non-zero coefficients with their features.
    pub fn coefficients(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        nonzero_coefficients(&self.features, &self.theta)
    }
}

fn nonzero_coefficients<'a>(
    features: &'a FeatureIndices,
    theta: &'a [f64],
) -> impl Iterator<Item = (Feature, f64)> + 'a {
    features
        .iter()
        .zip(&theta[1..])
        .filter(|(_, t)| **t != 0.0)
        .map(|(f, t)| (*f, *t))
}

/// Everything one call to [`Trainer::fit`] produced
#[derive(Debug, Clone, Default)]
pub struct TrainOutcome {
    /// One classifier per selection mode, in mode order
    pub classifiers: Vec<TrainedClassifier>,
    /// Estimator iterations (empty unless `save_trace`)
    pub trace: Trace,
    /// Regularisation path (empty unless `save_trace`)
    pub path: Vec<PathPoint>,
}

/// Selection and estimation over one universe of base features
pub struct Trainer<'a> {
    config: &'a TrainerConfig,
    ctx: &'a TrainingContext,
    estimator: Box<dyn Estimator>,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a TrainerConfig, ctx: &'a TrainingContext) -> Self {
        Self {
            config,
            ctx,
            estimator: make_estimator(config.estimator, config.step_scale),
        }
    }

    /// Train along `modes`.
    ///
    /// `data` holds labelled samples over `n_base` base features (position
    /// `id + 1`). `transform` covers the full coefficient space (base
    /// features, plus all pairs with `cooccurrence`) or is the identity.
    pub fn fit(
        &self,
        data: &[SparseSample],
        n_base: usize,
        cooccurrence: bool,
        transform: &StandardTransform,
        modes: &[SelectionMode],
    ) -> Result<TrainOutcome, TrainError> {
        if data.is_empty() {
            return Err(TrainError::EmptyData("no training samples".to_string()));
        }
        let mut labels = Vec::with_capacity(data.len());
        for (i, x) in data.iter().enumerate() {
            if x.n_features() != n_base {
                return Err(DataError::DimensionMismatch {
                    expected: n_base,
                    got: x.n_features(),
                }
                .into());
            }
            labels.push(x.label().ok_or(DataError::MissingLabel(i))?);
        }
        let full_dim = if cooccurrence {
            PairIndex::new(n_base).dim()
        } else {
            n_base + 1
        };
        if !transform.is_identity() && transform.len() != full_dim {
            return Err(DataError::DimensionMismatch {
                expected: full_dim,
                got: transform.len(),
            }
            .into());
        }

        let weights = class_weights(&labels, self.config.balance);
        let mut hook = ConvergenceHook::new(self.config.hook_config());
        let mut outcome = TrainOutcome::default();

        let mut features = FeatureIndices::default();
        let mut theta = vec![0.0];
        let mut lambda_prev: Option<f64> = None;
        let mut has_classifier = false;

        for &mode in modes {
            let selector = FeatureSelector::new(mode, n_base, transform)
                .with_cooccurrence(cooccurrence)
                .with_weights(weights)
                .with_epsilon_lambda(self.config.epsilon_lambda);
            let mut epochs = 0;
            let mut iterations = 0;
            let mut stop = None;
            let mut loss = None;

            while epochs < self.config.max_epochs && !self.ctx.is_cancelled() {
                let selection =
                    selector.select(self.ctx, data, &features, &theta, lambda_prev, has_classifier);
                if selection.done {
                    break;
                }
                let reduced = selector.reduce(self.ctx, data, &selection.features)?;
                let problem = Problem {
                    data: &reduced,
                    weights,
                    lambda: selection.lambda,
                    l2: self.config.l2,
                    transform: &selection.transform,
                };
                let mut next = selection.theta;
                let result = self.estimator.estimate(self.ctx, &problem, &mut next, &mut hook);

                epochs += 1;
                iterations += result.iterations;
                stop = Some(result.stop);
                loss = result.loss;
                features = selection.features;
                theta = next;
                lambda_prev = Some(selection.lambda);
                has_classifier = true;

                if self.config.save_trace {
                    outcome.path.push(PathPoint {
                        lambda: selection.lambda,
                        admitted: selection.admitted,
                        coefficients: nonzero_coefficients(&features, &theta).collect(),
                    });
                }
                log::debug!(
                    "epoch {}: lambda {:.6e}, {} active, {} non-zero after {} iterations ({})",
                    epochs,
                    selection.lambda,
                    features.len(),
                    nonzero_coefficients(&features, &theta).count(),
                    result.iterations,
                    result.stop
                );
                if result.stop == StopReason::NumericalFailure {
                    log::warn!("numerical failure at lambda {:.6e}, keeping last finite parameters", selection.lambda);
                    break;
                }
            }

            if self.ctx.is_cancelled() {
                return Err(TrainError::Cancelled);
            }
            let classifier = TrainedClassifier {
                mode,
                features: features.clone(),
                theta: theta.clone(),
                lambda: lambda_prev.unwrap_or(0.0),
                epochs,
                iterations,
                stop,
                loss,
            };
            log::debug!(
                "{:?} finished after {} epochs with {} non-zero coefficients",
                mode,
                epochs,
                classifier.nonzero()
            );
            outcome.classifiers.push(classifier);
        }

        if self.config.save_trace {
            outcome.trace = hook.into_trace();
        }
        Ok(outcome)
    }
}
