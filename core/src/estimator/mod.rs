//! Inner solvers for the L1-regularised sub-problem
//!
//! An estimator improves a parameter vector for a fixed working set of
//! features and a fixed `λ`. Two solvers are provided:
//!
//! - [`ProximalEstimator`]: proximal gradient with soft-thresholding
//! - [`CoordinateEstimator`]: IRLS with cyclic coordinate descent on the
//!   dense Gram matrix, for small working sets
//!
//! Both consult a [`ConvergenceHook`] once per iteration.

mod coordinate;
mod hook;
mod proximal;

pub use coordinate::CoordinateEstimator;
pub use hook::{relative_change, ConvergenceHook, HookAction, HookConfig, StopReason};
pub use proximal::{soft_threshold, ProximalEstimator};

use crate::logreg::LogisticRegression;
use crate::sparse::SparseSample;
use crate::training::TrainingContext;
use crate::transform::StandardTransform;
use serde::{Deserialize, Serialize};

/// Which inner solver to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    #[default]
    Proximal,
    Coordinate,
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorKind::Proximal => write!(f, "proximal"),
            EstimatorKind::Coordinate => write!(f, "coordinate"),
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proximal" => Ok(EstimatorKind::Proximal),
            "coordinate" => Ok(EstimatorKind::Coordinate),
            _ => Err(format!("unknown estimator `{}`", s)),
        }
    }
}

/// The sub-problem on a reduced data set.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    /// Labelled samples encoded over the working set
    pub data: &'a [SparseSample],
    pub weights: [f64; 2],
    pub lambda: f64,
    pub l2: f64,
    /// Transform aligned to the working set
    pub transform: &'a StandardTransform,
}

impl<'a> Problem<'a> {
    /// Loss model for `theta` including penalties.
    pub fn model<'b>(&'b self, theta: &'b [f64]) -> LogisticRegression<'b> {
        LogisticRegression::new(theta)
            .with_weights(self.weights)
            .with_lambda(self.lambda)
            .with_l2(self.l2)
            .with_transform(self.transform)
    }

    /// Regularised loss of `theta`.
    pub fn loss(&self, theta: &[f64]) -> f64 {
        self.model(theta).loss(self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of one estimate call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateOutcome {
    pub iterations: usize,
    pub stop: StopReason,
    /// Last evaluated regularised loss, if any
    pub loss: Option<f64>,
}

/// An inner solver
pub trait Estimator: Send + Sync {
    fn kind(&self) -> EstimatorKind;

    /// Improve `theta` in place for `problem`.
    fn estimate(
        &self,
        ctx: &TrainingContext,
        problem: &Problem<'_>,
        theta: &mut Vec<f64>,
        hook: &mut ConvergenceHook,
    ) -> EstimateOutcome;
}

/// Build the configured estimator.
pub fn make_estimator(kind: EstimatorKind, step_scale: f64) -> Box<dyn Estimator> {
    match kind {
        EstimatorKind::Proximal => Box::new(ProximalEstimator::new(step_scale)),
        EstimatorKind::Coordinate => Box::new(
            CoordinateEstimator::new().with_fallback(ProximalEstimator::new(step_scale)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("proximal".parse::<EstimatorKind>(), Ok(EstimatorKind::Proximal));
        assert_eq!("coordinate".parse::<EstimatorKind>(), Ok(EstimatorKind::Coordinate));
        assert!("saga".parse::<EstimatorKind>().is_err());
        assert_eq!(make_estimator(EstimatorKind::Coordinate, 1.0).kind(), EstimatorKind::Coordinate);
    }
}
