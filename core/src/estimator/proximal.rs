//! Proximal gradient estimator
//!
//! Minimises the mean objective `loss(θ)/n` with a fixed step
//!
//! ```text
//! s = η / (2L + min(2λ₂, L)),   L = 0.25 · w_max · (max_i ‖x_i‖² + 1) + λ₂/n
//! ```
//!
//! where `‖x_i‖` is the norm of the standardised sample. Each iteration
//! takes a gradient step on the smooth part and soft-thresholds `θ[1:]`
//! by `s·λ/n`. The hook may halve `s` when the loss increases.

use super::{
    relative_change, ConvergenceHook, EstimateOutcome, Estimator, EstimatorKind, HookAction,
    Problem, StopReason,
};
use crate::logreg::LogisticRegression;
use crate::training::TrainingContext;

/// `sign(x) · max(|x| − t, 0)`
#[inline]
pub fn soft_threshold(x: f64, t: f64) -> f64 {
    if x > t {
        x - t
    } else if x < -t {
        x + t
    } else {
        0.0
    }
}

/// One proximal step: `θ − s·g` followed by soft-thresholding of `θ[1:]`.
pub fn proximal_step(theta: &[f64], gradient: &[f64], step: f64, threshold: f64) -> Vec<f64> {
    theta
        .iter()
        .zip(gradient)
        .enumerate()
        .map(|(j, (t, g))| {
            let v = t - step * g;
            if j == 0 {
                v
            } else {
                soft_threshold(v, threshold)
            }
        })
        .collect()
}

/// Proximal gradient solver
#[derive(Debug, Clone, Copy)]
pub struct ProximalEstimator {
    /// Step size scale `η`
    step_scale: f64,
}

impl ProximalEstimator {
    pub fn new(step_scale: f64) -> Self {
        Self { step_scale }
    }

    /// Largest squared norm of a standardised sample.
    fn max_squared_norm(problem: &Problem<'_>) -> f64 {
        let t = problem.transform;
        if t.is_identity() {
            return problem
                .data
                .iter()
                .map(|x| x.squared_norm())
                .fold(0.0, f64::max);
        }
        let z = |j: usize| t.mu()[j] / t.sigma()[j];
        let zeros: f64 = (1..t.len()).map(|j| z(j).powi(2)).sum();
        problem
            .data
            .iter()
            .map(|x| {
                zeros
                    + x.features()
                        .map(|(j, v)| t.apply(v, j).powi(2) - z(j).powi(2))
                        .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }

    /// Initial step size for `problem`.
    pub fn step_size(&self, problem: &Problem<'_>) -> f64 {
        let n = problem.len().max(1) as f64;
        let w_max = problem.weights[0].max(problem.weights[1]);
        let l = 0.25 * w_max * (Self::max_squared_norm(problem) + 1.0) + problem.l2 / n;
        self.step_scale / (2.0 * l + (2.0 * problem.l2).min(l))
    }
}

impl Default for ProximalEstimator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Estimator for ProximalEstimator {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Proximal
    }

    fn estimate(
        &self,
        ctx: &TrainingContext,
        problem: &Problem<'_>,
        theta: &mut Vec<f64>,
        hook: &mut ConvergenceHook,
    ) -> EstimateOutcome {
        let mut loss = if hook.needs_loss() {
            Some(ctx.pool_lr().install(|| problem.loss(theta.as_slice())))
        } else {
            None
        };
        hook.begin(Some(problem.lambda), loss);
        if problem.is_empty() {
            return EstimateOutcome {
                iterations: 0,
                stop: StopReason::Converged,
                loss,
            };
        }

        let n = problem.len() as f64;
        let mut step = self.step_size(problem);
        log::trace!("proximal step size {:e} for {} samples", step, problem.len());

        loop {
            if ctx.is_cancelled() {
                return EstimateOutcome {
                    iterations: hook.iterations(),
                    stop: StopReason::Cancelled,
                    loss,
                };
            }
            let gradient = ctx.pool_lr().install(|| {
                LogisticRegression::new(theta.as_slice())
                    .with_weights(problem.weights)
                    .with_l2(problem.l2)
                    .with_transform(problem.transform)
                    .gradient(problem.data)
            });
            let mean_gradient: Vec<f64> = gradient.iter().map(|g| g / n).collect();
            let candidate = proximal_step(theta, &mean_gradient, step, step * problem.lambda / n);
            let change = relative_change(theta, &candidate);
            let candidate_loss = if hook.needs_loss() {
                Some(ctx.pool_lr().install(|| problem.loss(&candidate)))
            } else {
                None
            };

            match hook.step(&candidate, change, candidate_loss) {
                HookAction::Continue => {
                    *theta = candidate;
                    loss = candidate_loss.or(loss);
                }
                HookAction::HalveStep => {
                    step /= 2.0;
                }
                HookAction::Stop(reason) => {
                    let worse = matches!((candidate_loss, loss), (Some(c), Some(l)) if c > l);
                    if reason != StopReason::NumericalFailure && !worse {
                        *theta = candidate;
                        loss = candidate_loss.or(loss);
                    }
                    log::debug!(
                        "proximal estimator stopped after {} iterations: {}",
                        hook.iterations(),
                        reason
                    );
                    return EstimateOutcome {
                        iterations: hook.iterations(),
                        stop: reason,
                        loss,
                    };
                }
            }
        }
    }
}
