//! Iteratively reweighted coordinate descent
//!
//! Each outer iteration forms the quadratic approximation of the weighted
//! log-likelihood at the current `θ` (weights `w_i = p_i(1−p_i)·w[y_i]`,
//! working response `z_i`), accumulates the Gram matrix `XᵀWX` and
//! `XᵀWz` on the dense standardised design, and solves the penalised
//! quadratic by cyclic coordinate updates
//!
//! ```text
//! θ_j ← shrink(b_j − Σ_{k≠j} G_jk θ_k, λ) / (G_jj + λ₂)
//! ```
//!
//! The bias is not penalised.

use super::proximal::soft_threshold;
use super::{
    relative_change, ConvergenceHook, EstimateOutcome, Estimator, EstimatorKind, HookAction,
    Problem, ProximalEstimator, StopReason,
};
use crate::constants::{sigmoid, IRLS_MIN_WEIGHT};
use crate::training::TrainingContext;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

const MAX_SWEEPS: usize = 200;
const SWEEP_TOLERANCE: f64 = 1e-10;

/// IRLS coordinate-descent solver
#[derive(Debug, Clone, Copy)]
pub struct CoordinateEstimator {
    /// Largest parameter dimension for which the Gram matrix is formed
    max_dim: usize,
    /// Used for working sets above `max_dim`
    fallback: ProximalEstimator,
}

impl CoordinateEstimator {
    pub fn new() -> Self {
        Self {
            max_dim: 2048,
            fallback: ProximalEstimator::default(),
        }
    }

    pub fn with_max_dim(mut self, max_dim: usize) -> Self {
        self.max_dim = max_dim;
        self
    }

    pub fn with_fallback(mut self, fallback: ProximalEstimator) -> Self {
        self.fallback = fallback;
        self
    }

    /// Dense standardised design matrix with a leading bias column.
    fn design(problem: &Problem<'_>, dim: usize) -> DMatrix<f64> {
        let t = problem.transform;
        let mut x = DMatrix::zeros(problem.len(), dim);
        for (i, sample) in problem.data.iter().enumerate() {
            x[(i, 0)] = 1.0;
            if !t.is_identity() {
                for j in 1..dim {
                    x[(i, j)] = t.apply(0.0, j);
                }
            }
            for (j, v) in sample.features() {
                x[(i, j)] = t.apply(v, j);
            }
        }
        x
    }

    /// Solve the penalised quadratic `½θᵀGθ − bᵀθ + λ‖θ[1:]‖₁ + λ₂/2‖θ[1:]‖²`
    /// starting from `theta`.
    fn solve_quadratic(g: &DMatrix<f64>, b: &DVector<f64>, lambda: f64, l2: f64, theta: &mut [f64]) {
        let dim = theta.len();
        for _ in 0..MAX_SWEEPS {
            let mut max_delta: f64 = 0.0;
            for j in 0..dim {
                let mut rho = b[j];
                for k in 0..dim {
                    if k != j {
                        rho -= g[(j, k)] * theta[k];
                    }
                }
                let updated = if j == 0 {
                    rho / g[(0, 0)]
                } else {
                    soft_threshold(rho, lambda) / (g[(j, j)] + l2)
                };
                let updated = if updated.is_finite() { updated } else { 0.0 };
                max_delta = max_delta.max((updated - theta[j]).abs());
                theta[j] = updated;
            }
            if max_delta < SWEEP_TOLERANCE {
                break;
            }
        }
    }
}

impl Default for CoordinateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for CoordinateEstimator {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Coordinate
    }

    fn estimate(
        &self,
        ctx: &TrainingContext,
        problem: &Problem<'_>,
        theta: &mut Vec<f64>,
        hook: &mut ConvergenceHook,
    ) -> EstimateOutcome {
        let dim = theta.len();
        if dim > self.max_dim {
            log::debug!(
                "working set of {} exceeds {} coefficients, using proximal estimator",
                dim,
                self.max_dim
            );
            return self.fallback.estimate(ctx, problem, theta, hook);
        }

        let mut loss = if hook.needs_loss() {
            Some(problem.loss(theta.as_slice()))
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

        let x = Self::design(problem, dim);
        let labels: Vec<f64> = problem
            .data
            .iter()
            .map(|s| if s.label() == Some(true) { 1.0 } else { 0.0 })
            .collect();
        let class_weight: Vec<f64> = labels
            .iter()
            .map(|&y| problem.weights[usize::from(y > 0.5)])
            .collect();
        let mut damping = 1.0;

        loop {
            if ctx.is_cancelled() {
                return EstimateOutcome {
                    iterations: hook.iterations(),
                    stop: StopReason::Cancelled,
                    loss,
                };
            }

            let current = DVector::from_column_slice(theta);
            let z = &x * &current;
            let (gram, rhs) = ctx.pool_saga().install(|| {
                (0..problem.len())
                    .into_par_iter()
                    .fold(
                        || (DMatrix::<f64>::zeros(dim, dim), DVector::<f64>::zeros(dim)),
                        |(mut g, mut b), i| {
                            let p = sigmoid(z[i]);
                            let pw = (p * (1.0 - p)).max(IRLS_MIN_WEIGHT);
                            let w = class_weight[i] * pw;
                            let response = z[i] + (labels[i] - p) / pw;
                            let row = x.row(i).transpose();
                            g.ger(w, &row, &row, 1.0);
                            b.axpy(w * response, &row, 1.0);
                            (g, b)
                        },
                    )
                    .reduce(
                        || (DMatrix::zeros(dim, dim), DVector::zeros(dim)),
                        |(g1, b1), (g2, b2)| (g1 + g2, b1 + b2),
                    )
            });

            let mut newton = theta.clone();
            Self::solve_quadratic(&gram, &rhs, problem.lambda, problem.l2, &mut newton);
            let candidate: Vec<f64> = theta
                .iter()
                .zip(&newton)
                .map(|(old, new)| old + damping * (new - old))
                .collect();
            let change = relative_change(theta, &candidate);
            let candidate_loss = if hook.needs_loss() {
                Some(problem.loss(&candidate))
            } else {
                None
            };

            match hook.step(&candidate, change, candidate_loss) {
                HookAction::Continue => {
                    *theta = candidate;
                    loss = candidate_loss.or(loss);
                }
                HookAction::HalveStep => {
                    damping /= 2.0;
                }
                HookAction::Stop(reason) => {
                    let worse = matches!((candidate_loss, loss), (Some(c), Some(l)) if c > l);
                    if reason != StopReason::NumericalFailure && !worse {
                        *theta = candidate;
                        loss = candidate_loss.or(loss);
                    }
                    log::debug!(
                        "coordinate estimator stopped after {} iterations: {}",
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
