//! Numerical constants shared by the training engine.
//!
//! These values fix tolerances that are part of the model file contract
//! (transforms are compared with `TRANSFORM_TOLERANCE` when classifiers
//! are combined), so changing them changes which models can be merged.

/// Maximum absolute disagreement between two transform slots that are
/// considered identical.
pub const TRANSFORM_TOLERANCE: f64 = 1e-12;

/// Number of trailing trace rows used for the non-zero variance stop.
pub const NZ_VARIANCE_WINDOW: usize = 10;

/// Default seed for fold partitioning and ensemble sub-sampling.
pub const DEFAULT_SEED: u64 = 42;

/// Lower bound on `p(1-p)` in the IRLS weights.
pub const IRLS_MIN_WEIGHT: f64 = 1e-5;

/// Member probabilities are kept within `[PROBABILITY_CLAMP, 1 - PROBABILITY_CLAMP]`
/// before a product summary.
pub const PROBABILITY_CLAMP: f64 = 1e-12;

/// Number of non-zero sample entries above which pair sums are split
/// across the worker pool.
pub const PARALLEL_PAIR_THRESHOLD: usize = 64;

/// Softplus `log(1 + exp(z))` evaluated without overflow.
pub fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
