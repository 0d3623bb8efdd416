//! Configuration for training
//!
//! Defines every knob of the outer selection loop, the inner estimators and
//! the ensemble trainer. The struct deserialises from partial documents
//! (missing fields take their defaults), so a TOML file only needs to name
//! what it changes.

use super::TrainError;
use crate::constants::DEFAULT_SEED;
use crate::estimator::{EstimatorKind, HookConfig};
use crate::model::Summary;
use crate::selector::SelectionMode;
use serde::{Deserialize, Serialize};

/// Configuration for the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Target cardinalities for automatic λ (empty = fixed λ)
    pub lambda_auto: Vec<usize>,

    /// Fixed λ when `lambda_auto` is empty
    pub lambda: f64,

    /// Cap on admitted features in fixed-λ mode
    pub max_features: Option<usize>,

    /// L2 penalty λ₂ (default: 0)
    pub l2: f64,

    /// Weight classes inversely to their frequency
    pub balance: bool,

    /// Include pairwise co-occurrence features
    pub cooccurrence: bool,

    /// Standardise features (default: true)
    pub normalize: bool,

    /// Outer selection iterations per target
    pub max_epochs: usize,

    /// Inner estimator iterations per call
    pub max_iterations: usize,

    /// Relative parameter change for convergence
    pub epsilon: f64,

    /// Stop the outer loop when λ moves less than this (0 = off)
    pub epsilon_lambda: f64,

    /// Stop when the loss moves less than this (0 = off)
    pub epsilon_loss: f64,

    /// Stop when the variance of the non-zero count drops below this (0 = off)
    pub epsilon_var: f64,

    /// Evaluate the loss every iteration
    pub eval_loss: bool,

    /// Scale of the proximal step size
    pub step_scale: f64,

    /// Inner solver
    pub estimator: EstimatorKind,

    /// Number of ensemble members (1 = single classifier)
    pub ensemble_size: usize,

    /// Prediction summary of a multi-member ensemble
    pub summary: Summary,

    /// Folds for cross-validation (0 = off)
    pub k_fold_cv: usize,

    /// Fraction of each training portion held out to choose λ (0 = off)
    pub validation_fraction: f64,

    /// Target of a single pre-selection pass shrinking the universe
    pub preselect: Option<usize>,

    /// Keep the per-iteration trace and the regularisation path
    pub save_trace: bool,

    /// Random seed for fold assignment
    pub seed: u64,

    /// Threads for folds and members (0 = all CPUs)
    pub threads_cv: usize,

    /// Threads for Gram matrix accumulation (0 = all CPUs)
    pub threads_saga: usize,

    /// Threads for loss and gradient evaluation (0 = all CPUs)
    pub threads_lr: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            lambda_auto: Vec::new(),
            lambda: 0.0,
            max_features: None,
            l2: 0.0,
            balance: false,
            cooccurrence: false,
            normalize: true,
            max_epochs: 100,
            max_iterations: 1000,
            epsilon: 1e-5,
            epsilon_lambda: 0.0,
            epsilon_loss: 0.0,
            epsilon_var: 0.0,
            eval_loss: false,
            step_scale: 1.0,
            estimator: EstimatorKind::Proximal,
            ensemble_size: 1,
            summary: Summary::Mean,
            k_fold_cv: 0,
            validation_fraction: 0.0,
            preselect: None,
            save_trace: false,
            seed: DEFAULT_SEED,
            threads_cv: 0,
            threads_saga: 0,
            threads_lr: 0,
        }
    }
}

impl TrainerConfig {
    /// Fewer iterations and a looser tolerance
    pub fn quick() -> Self {
        Self {
            max_epochs: 20,
            max_iterations: 200,
            epsilon: 1e-4,
            ..Default::default()
        }
    }

    /// More iterations, tighter tolerance and loss monitoring
    pub fn thorough() -> Self {
        Self {
            max_epochs: 500,
            max_iterations: 10_000,
            epsilon: 1e-7,
            eval_loss: true,
            ..Default::default()
        }
    }

    /// Set automatic-λ targets
    pub fn with_lambda_auto(mut self, targets: Vec<usize>) -> Self {
        self.lambda_auto = targets;
        self
    }

    /// Set a fixed λ
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self.lambda_auto.clear();
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_cooccurrence(mut self, cooccurrence: bool) -> Self {
        self.cooccurrence = cooccurrence;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_balance(mut self, balance: bool) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_epsilon_loss(mut self, epsilon_loss: f64) -> Self {
        self.epsilon_loss = epsilon_loss;
        self
    }

    pub fn with_eval_loss(mut self, eval_loss: bool) -> Self {
        self.eval_loss = eval_loss;
        self
    }

    pub fn with_estimator(mut self, estimator: EstimatorKind) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_ensemble_size(mut self, size: usize) -> Self {
        self.ensemble_size = size;
        self
    }

    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_preselect(mut self, target: usize) -> Self {
        self.preselect = Some(target);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set all three pools to `threads`
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads_cv = threads;
        self.threads_saga = threads;
        self.threads_lr = threads;
        self
    }

    /// Selection modes in training order; automatic targets ascend so that
    /// each one warm-starts from the previous.
    pub fn selection_modes(&self) -> Vec<SelectionMode> {
        if self.lambda_auto.is_empty() {
            return vec![SelectionMode::Fixed {
                lambda: self.lambda,
                max_features: self.max_features,
            }];
        }
        let mut targets = self.lambda_auto.clone();
        targets.sort_unstable();
        targets.dedup();
        targets
            .into_iter()
            .map(|target| SelectionMode::Auto { target })
            .collect()
    }

    /// Stopping thresholds for the inner estimators
    pub fn hook_config(&self) -> HookConfig {
        HookConfig {
            epsilon: self.epsilon,
            epsilon_loss: self.epsilon_loss,
            epsilon_var: self.epsilon_var,
            max_iterations: self.max_iterations,
            eval_loss: self.eval_loss,
        }
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |msg: &str| Err(TrainError::InvalidConfig(msg.to_string()));
        if self.lambda_auto.iter().any(|&n| n == 0) {
            return invalid("lambda-auto targets must be positive");
        }
        if !(self.lambda >= 0.0) || !(self.l2 >= 0.0) {
            return invalid("lambda and l2 must be non-negative");
        }
        if !(self.step_scale > 0.0) {
            return invalid("step size scale must be positive");
        }
        if self.max_iterations == 0 || self.max_epochs == 0 {
            return invalid("max-iterations and max-epochs must be positive");
        }
        if self.ensemble_size == 0 {
            return invalid("ensemble size must be at least 1");
        }
        if self.k_fold_cv == 1 {
            return invalid("cross-validation needs at least 2 folds");
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return invalid("validation fraction must be in [0, 1)");
        }
        if self.preselect == Some(0) {
            return invalid("pre-selection target must be positive");
        }
        Ok(())
    }
}
