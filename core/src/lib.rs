//! kmerLr Core - Sparse Logistic Regression Engine
//!
//! This crate provides the training engine for sparse L1-regularised
//! logistic regression over k-mer counts (optionally with pairwise
//! co-occurrences) and numeric score tables.
//!
//! # Features
//!
//! - **Sparse encoding**: k-mer and score samples over an active feature
//!   list, pairwise products expanded on demand
//! - **Feature selection**: working sets grown towards a target number of
//!   non-zero coefficients (automatic λ) or admitted by a fixed λ
//! - **Estimators**: proximal gradient with soft-thresholding, or IRLS
//!   coordinate descent for small working sets
//! - **Ensembles**: members trained on stratified folds, combined by
//!   coefficient mean/min/max or by prediction summary
//! - **Model files**: self-describing JSON documents
//!
//! # Example
//!
//! ```rust,ignore
//! use kmerlr_core::training::{EnsembleTrainer, TrainerConfig};
//! use kmerlr_core::{save_model, FeatureCatalog};
//!
//! let config = TrainerConfig::default().with_lambda_auto(vec![20]);
//! let trainer = EnsembleTrainer::from_config(config)?;
//! let result = trainer.train(&catalog, &samples, &[])?;
//! save_model("model.json", &result.into_model().compact())?;
//! ```

// Data representation
pub mod constants;
pub mod encoder;
pub mod features;
pub mod io;
pub mod kmer;
pub mod pair_index;
pub mod sparse;
pub mod transform;

// Optimisation
pub mod estimator;
pub mod logreg;
pub mod selector;
pub mod trace;
pub mod training;

// Models
pub mod coefficients;
pub mod combine;
pub mod metrics;
pub mod model;
pub mod model_io;

#[cfg(test)]
pub(crate) mod test_data;

// Re-exports for convenience
pub use coefficients::CoefficientSet;
pub use combine::{combine_coefficients, combine_ensembles, IncompatibleError};
pub use encoder::CountEncoder;
pub use estimator::{EstimatorKind, StopReason};
pub use features::{BaseKey, Feature, FeatureCatalog, FeatureIndices, FeatureKey};
pub use io::DataError;
pub use kmer::{Alphabet, KmerClass, KmerClassId, KmerConfig, KmerCounter, KmerCounts};
pub use logreg::LogisticRegression;
pub use metrics::{cosine_similarity, roc_auc, EvaluationMetrics};
pub use model::{Ensemble, Summary};
pub use model_io::{load_model, read_model, save_model, write_model};
pub use pair_index::PairIndex;
pub use selector::{FeatureSelector, SelectionMode};
pub use sparse::SparseSample;
pub use trace::{PathRecorder, Trace};
pub use training::{EnsembleTrainer, TrainError, TrainerConfig, TrainingContext};
pub use transform::StandardTransform;
