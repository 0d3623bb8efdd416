//! Convergence checks shared by the inner estimators
//!
//! The hook is consulted once per iteration, after the candidate update is
//! computed. Checks run in a fixed order and the first one that fires
//! decides the action:
//!
//! 1. non-finite parameters or loss stop the estimator
//! 2. a loss increase asks the estimator to halve its step
//! 3. a loss plateau (`|Δloss| < epsilon_loss`) stops
//! 4. a flat non-zero count over the last iterations stops
//! 5. a small relative parameter change (`≤ epsilon`) stops
//! 6. the iteration limit stops

use crate::constants::NZ_VARIANCE_WINDOW;
use crate::trace::{comp_var, Trace, TraceRow};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Why an estimator stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Relative parameter change fell below epsilon
    Converged,
    /// Iteration limit reached
    MaxIterations,
    /// Loss change fell below epsilon_loss
    LossPlateau,
    /// Number of non-zeros stopped varying
    NonzeroVariance,
    /// NaN or infinity detected; the last finite parameters are kept
    NumericalFailure,
    /// Cancellation requested
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Converged => write!(f, "converged"),
            StopReason::MaxIterations => write!(f, "max_iterations"),
            StopReason::LossPlateau => write!(f, "loss_plateau"),
            StopReason::NonzeroVariance => write!(f, "nonzero_variance"),
            StopReason::NumericalFailure => write!(f, "numerical_failure"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What the estimator should do with the candidate update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Accept the update and continue
    Continue,
    /// Reject the update and retry with half the step
    HalveStep,
    /// Stop; the update is accepted unless the reason is a numerical failure
    Stop(StopReason),
}

/// Stopping thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    pub epsilon: f64,
    pub epsilon_loss: f64,
    pub epsilon_var: f64,
    pub max_iterations: usize,
    /// Evaluate the loss every iteration even without a loss criterion
    pub eval_loss: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            epsilon_loss: 0.0,
            epsilon_var: 0.0,
            max_iterations: 1000,
            eval_loss: false,
        }
    }
}

/// Per-iteration convergence controller with an attached trace
#[derive(Debug, Clone)]
pub struct ConvergenceHook {
    config: HookConfig,
    trace: Trace,
    started: Instant,
    /// First trace row of the current estimate call
    call_start: usize,
    iteration: usize,
    total_iterations: usize,
    lambda: Option<f64>,
    last_loss: Option<f64>,
    halvings: usize,
}

impl ConvergenceHook {
    pub fn new(config: HookConfig) -> Self {
        Self {
            config,
            trace: Trace::new(),
            started: Instant::now(),
            call_start: 0,
            iteration: 0,
            total_iterations: 0,
            lambda: None,
            last_loss: None,
            halvings: 0,
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// Whether estimators must evaluate the loss each iteration.
    pub fn needs_loss(&self) -> bool {
        self.config.eval_loss || self.config.epsilon_loss > 0.0
    }

    /// Prepare for a new estimate call at `lambda`. The trace is kept.
    pub fn begin(&mut self, lambda: Option<f64>, initial_loss: Option<f64>) {
        self.call_start = self.trace.len();
        self.iteration = 0;
        self.lambda = lambda;
        self.last_loss = initial_loss;
        self.halvings = 0;
    }

    /// Iterations of the current call.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Step halvings requested during the current call.
    pub fn halvings(&self) -> usize {
        self.halvings
    }

    pub fn last_loss(&self) -> Option<f64> {
        self.last_loss
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn into_trace(self) -> Trace {
        self.trace
    }

    /// Judge a candidate update `theta` with relative change `change`
    /// and, if evaluated, its regularised `loss`.
    pub fn step(&mut self, theta: &[f64], change: f64, loss: Option<f64>) -> HookAction {
        self.iteration += 1;
        self.total_iterations += 1;
        let nonzero = theta.iter().skip(1).filter(|t| **t != 0.0).count();
        self.trace.push(TraceRow {
            duration: self.started.elapsed().as_secs_f64(),
            iteration: self.total_iterations,
            change,
            nonzero,
            lambda: self.lambda,
            loss,
        });

        if theta.iter().any(|t| !t.is_finite()) || loss.map_or(false, |l| !l.is_finite()) {
            log::warn!("non-finite parameters at iteration {}", self.iteration);
            return HookAction::Stop(StopReason::NumericalFailure);
        }

        let previous = self.last_loss;
        if let (Some(loss), Some(prev)) = (loss, previous) {
            if loss > prev + 1e-12 * prev.abs().max(1.0) {
                self.halvings += 1;
                if self.iteration >= self.config.max_iterations {
                    return HookAction::Stop(StopReason::MaxIterations);
                }
                log::debug!("loss increased {} -> {}, halving step", prev, loss);
                return HookAction::HalveStep;
            }
        }
        if loss.is_some() {
            self.last_loss = loss;
        }

        if self.config.epsilon_loss > 0.0 {
            if let (Some(loss), Some(prev)) = (loss, previous) {
                if (prev - loss).abs() < self.config.epsilon_loss {
                    return HookAction::Stop(StopReason::LossPlateau);
                }
            }
        }

        if self.config.epsilon_var > 0.0 {
            let var = comp_var(&self.trace.rows()[self.call_start..], NZ_VARIANCE_WINDOW);
            if var < self.config.epsilon_var {
                return HookAction::Stop(StopReason::NonzeroVariance);
            }
        }

        if change <= self.config.epsilon {
            return HookAction::Stop(StopReason::Converged);
        }

        if self.iteration >= self.config.max_iterations {
            return HookAction::Stop(StopReason::MaxIterations);
        }
        HookAction::Continue
    }
}

/// `max |Δθ| / max |θ'|`, or 0 when both are zero.
pub fn relative_change(old: &[f64], new: &[f64]) -> f64 {
    let delta = old
        .iter()
        .zip(new)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    let scale = new.iter().map(|v| v.abs()).fold(0.0, f64::max);
    if delta == 0.0 {
        0.0
    } else if scale == 0.0 {
        f64::INFINITY
    } else {
        delta / scale
    }
}
