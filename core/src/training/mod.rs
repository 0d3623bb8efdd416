//! Training of sparse logistic-regression classifiers
//!
//! Provides:
//! - The outer selection loop alternating working-set selection and the
//!   inner estimator, over one or more λ targets
//! - Ensemble training over stratified partitions of the training set
//! - Held-out validation to choose among λ targets
//! - K-fold cross-validation with per-fold seeding
//! - Training reports
//!
//! # Example
//!
//! ```rust,ignore
//! use kmerlr_core::training::{EnsembleTrainer, TrainerConfig};
//!
//! let config = TrainerConfig::default().with_lambda_auto(vec![10, 20]);
//! let trainer = EnsembleTrainer::from_config(config)?;
//! let result = trainer.train(&catalog, &samples, &[])?;
//! println!("{}", result.report.summary());
//! ```

mod config;
mod context;
mod ensemble;
mod report;
mod splitter;
mod trainer;

pub use config::TrainerConfig;
pub use context::TrainingContext;
pub use ensemble::{Candidate, CrossValidation, CvPrediction, EnsembleResult, EnsembleTrainer};
pub use report::{CandidateEntry, MemberEntry, Recommendation, TrainingReport};
pub use splitter::{DataSplitter, SplitData};
pub use trainer::{class_weights, PathPoint, TrainOutcome, TrainedClassifier, Trainer};

use crate::io::DataError;
use thiserror::Error;

/// Errors raised while setting up or running training
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Empty training data: {0}")]
    EmptyData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Thread pool: {0}")]
    ThreadPool(String),

    #[error("Training cancelled")]
    Cancelled,

    #[error(transparent)]
    Data(#[from] DataError),
}
