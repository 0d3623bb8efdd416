//! Shared command-line options
//!
//! `learn` and `learn-scores` share the training flags; k-mer commands share
//! the counting flags. Training options resolve in this order (later wins):
//! built-in defaults or preset, ~/.kmerlr/config.toml, `--config FILE.toml`,
//! explicit flags.

use anyhow::{Context, Result};
use clap::Args;
use kmerlr_core::{Alphabet, EstimatorKind, KmerConfig, Summary, TrainerConfig};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;

/// K-mer counting options
#[derive(Args, Debug, Clone)]
pub struct KmerArgs {
    /// Alphabet: nucleotide, gapped-nucleotide or iupac-nucleotide
    #[arg(long, default_value = "nucleotide")]
    pub alphabet: Alphabet,

    /// Count presence instead of occurrences
    #[arg(long)]
    pub binarize: bool,

    /// Merge k-mers with their complement
    #[arg(long)]
    pub complement: bool,

    /// Merge k-mers with their reverse
    #[arg(long)]
    pub reverse: bool,

    /// Merge k-mers with their reverse complement
    #[arg(long)]
    pub revcomp: bool,

    /// Ambiguous positions per k-mer: one value, or one per length (-1 = unlimited)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub max_ambiguous: Vec<i64>,
}

impl KmerArgs {
    /// Counting configuration for lengths `m..=n`.
    pub fn kmer_config(&self, m: usize, n: usize, cooccurrence: bool) -> Result<KmerConfig> {
        let config = KmerConfig {
            complement: self.complement,
            reverse: self.reverse,
            revcomp: self.revcomp,
            binarize: self.binarize,
            max_ambiguous: self.max_ambiguous.clone(),
            cooccurrence,
            ..KmerConfig::new(self.alphabet, m, n)
        };
        config.validate()?;
        Ok(config)
    }
}

/// Training options
#[derive(Args, Debug, Clone, Default)]
pub struct LearnArgs {
    /// Target numbers of non-zero coefficients (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub lambda_auto: Vec<usize>,

    /// Fixed L1 penalty when --lambda-auto is not given
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Cap on admitted features with a fixed penalty
    #[arg(long)]
    pub max_features: Option<usize>,

    /// L2 penalty
    #[arg(long)]
    pub l2: Option<f64>,

    /// Weight classes inversely to their frequency
    #[arg(long)]
    pub balance: bool,

    /// Include pairwise co-occurrence features
    #[arg(long = "co-occurrence")]
    pub cooccurrence: bool,

    /// Do not standardise features
    #[arg(long)]
    pub no_normalization: bool,

    #[arg(long)]
    pub max_epochs: Option<usize>,

    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Relative parameter change for convergence
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Stop selecting when lambda moves less than this
    #[arg(long)]
    pub epsilon_lambda: Option<f64>,

    /// Stop when the loss moves less than this
    #[arg(long)]
    pub epsilon_loss: Option<f64>,

    /// Stop when the number of non-zeros stops varying
    #[arg(long)]
    pub epsilon_var: Option<f64>,

    /// Evaluate the loss at every iteration
    #[arg(long)]
    pub eval_loss: bool,

    /// Scale of the proximal step size
    #[arg(long = "scale-step-size")]
    pub step_scale: Option<f64>,

    /// Inner solver: proximal or coordinate
    #[arg(long)]
    pub estimator: Option<EstimatorKind>,

    /// Number of ensemble members
    #[arg(long)]
    pub ensemble_size: Option<usize>,

    /// Prediction summary of the ensemble: mean, product, min, max or none
    #[arg(long)]
    pub ensemble_summary: Option<Summary>,

    /// Fraction of the training data held out to choose between targets
    #[arg(long)]
    pub validation_fraction: Option<f64>,

    /// Shrink the feature universe with one pass aiming for N features
    #[arg(long)]
    pub preselect: Option<usize>,

    /// Evaluate by K-fold cross-validation instead of fitting one model
    #[arg(long = "k-fold-cv")]
    pub k_fold_cv: Option<usize>,

    /// Write the optimisation trace and regularisation path
    #[arg(long)]
    pub save_trace: bool,

    /// Seed for fold assignment
    #[arg(long)]
    pub seed: Option<u64>,

    /// Threads for all pools (0 = all CPUs)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Threads for folds and ensemble members
    #[arg(long)]
    pub threads_cv: Option<usize>,

    /// Threads for Gram matrix accumulation
    #[arg(long)]
    pub threads_saga: Option<usize>,

    /// Fewer iterations and a looser tolerance
    #[arg(long, conflicts_with = "thorough")]
    pub quick: bool,

    /// More iterations and a tighter tolerance
    #[arg(long)]
    pub thorough: bool,

    /// Training configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the training report (JSON)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl LearnArgs {
    /// Resolve the training configuration.
    pub fn trainer_config(&self, settings: &Settings) -> Result<TrainerConfig> {
        let mut config = if self.quick {
            TrainerConfig::quick()
        } else if self.thorough {
            TrainerConfig::thorough()
        } else {
            TrainerConfig::default()
        };

        if let Some(t) = settings.threads_cv() {
            config.threads_cv = t;
        }
        if let Some(t) = settings.threads_saga() {
            config.threads_saga = t;
        }
        if let Some(t) = settings.threads_lr() {
            config.threads_lr = t;
        }
        if let Some(seed) = settings.seed {
            config.seed = seed;
        }

        if let Some(path) = &self.config {
            config = overlay_file(&config, path)?;
        }

        self.apply_flags(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_flags(&self, config: &mut TrainerConfig) {
        if !self.lambda_auto.is_empty() {
            config.lambda_auto = self.lambda_auto.clone();
        }
        if let Some(lambda) = self.lambda {
            config.lambda = lambda;
            if self.lambda_auto.is_empty() {
                config.lambda_auto.clear();
            }
        }
        if self.max_features.is_some() {
            config.max_features = self.max_features;
        }
        if let Some(l2) = self.l2 {
            config.l2 = l2;
        }
        config.balance |= self.balance;
        config.cooccurrence |= self.cooccurrence;
        if self.no_normalization {
            config.normalize = false;
        }
        if let Some(v) = self.max_epochs {
            config.max_epochs = v;
        }
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        if let Some(v) = self.epsilon {
            config.epsilon = v;
        }
        if let Some(v) = self.epsilon_lambda {
            config.epsilon_lambda = v;
        }
        if let Some(v) = self.epsilon_loss {
            config.epsilon_loss = v;
        }
        if let Some(v) = self.epsilon_var {
            config.epsilon_var = v;
        }
        config.eval_loss |= self.eval_loss;
        if let Some(v) = self.step_scale {
            config.step_scale = v;
        }
        if let Some(v) = self.estimator {
            config.estimator = v;
        }
        if let Some(v) = self.ensemble_size {
            config.ensemble_size = v;
        }
        if let Some(v) = self.ensemble_summary {
            config.summary = v;
        }
        if let Some(v) = self.validation_fraction {
            config.validation_fraction = v;
        }
        if self.preselect.is_some() {
            config.preselect = self.preselect;
        }
        if let Some(v) = self.k_fold_cv {
            config.k_fold_cv = v;
        }
        config.save_trace |= self.save_trace;
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(t) = self.threads {
            config.threads_cv = t;
            config.threads_saga = t;
            config.threads_lr = t;
        }
        if let Some(t) = self.threads_cv {
            config.threads_cv = t;
        }
        if let Some(t) = self.threads_saga {
            config.threads_saga = t;
        }
    }
}

/// Overlay the keys of a TOML file onto `base`.
fn overlay_file(base: &TrainerConfig, path: &Path) -> Result<TrainerConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: toml::Table = toml::from_str(&contents)
        .with_context(|| format!("Invalid training configuration {}", path.display()))?;

    let mut merged = match toml::Value::try_from(base)? {
        toml::Value::Table(table) => table,
        _ => anyhow::bail!("training configuration is not a table"),
    };
    for (key, value) in file {
        merged.insert(key, value);
    }
    let config: TrainerConfig = toml::Value::Table(merged)
        .try_into()
        .with_context(|| format!("Invalid training configuration {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        learn: LearnArgs,
        #[command(flatten)]
        kmer: KmerArgs,
    }

    fn parse(args: &[&str]) -> TestCli {
        let mut argv = vec!["kmerlr"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "--lambda-auto=8,2",
            "--balance",
            "--max-iterations",
            "100",
            "--epsilon-loss",
            "1e-6",
            "--scale-step-size",
            "0.5",
            "--no-normalization",
            "--ensemble-summary",
            "max",
        ]);
        let config = cli.learn.trainer_config(&Settings::default()).unwrap();
        assert_eq!(config.lambda_auto, vec![8, 2]);
        assert!(config.balance);
        assert!(!config.normalize);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.epsilon_loss, 1e-6);
        assert_eq!(config.step_scale, 0.5);
        assert_eq!(config.summary, Summary::Max);
        assert_eq!(config.l2, 0.0);
    }

    #[test]
    fn test_settings_then_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.toml");
        fs::write(&path, "seed = 5\nmax_epochs = 7\nlambda_auto = [3]\n").unwrap();

        let settings = Settings {
            threads: Some(2),
            seed: Some(11),
            ..Default::default()
        };
        let file = path.to_string_lossy().to_string();
        let cli = parse(&["--config", &file, "--max-epochs", "9"]);
        let config = cli.learn.trainer_config(&settings).unwrap();
        assert_eq!(config.threads_cv, 2);
        assert_eq!(config.threads_lr, 2);
        assert_eq!(config.seed, 5);
        assert_eq!(config.max_epochs, 9);
        assert_eq!(config.lambda_auto, vec![3]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cli = parse(&["--lambda-auto=0"]);
        assert!(cli.learn.trainer_config(&Settings::default()).is_err());
        assert!(TestCli::try_parse_from(["kmerlr", "--alphabet", "protein"]).is_err());
        assert!(TestCli::try_parse_from(["kmerlr", "--quick", "--thorough"]).is_err());
    }

    #[test]
    fn test_kmer_config() {
        let cli = parse(&["--alphabet", "gapped-nucleotide", "--revcomp", "--max-ambiguous=1,-1"]);
        let config = cli.kmer.kmer_config(4, 5, true).unwrap();
        assert_eq!(config.alphabet, Alphabet::GappedNucleotide);
        assert!(config.revcomp);
        assert!(config.cooccurrence);
        assert_eq!(config.max_ambiguous, vec![1, -1]);
        assert_eq!(config.max_ambiguous_for(5), None);
        assert!(cli.kmer.kmer_config(4, 6, false).is_err());
    }
}
