//! kmerlr - sparse logistic regression on k-mer and score features
//!
//! Usage:
//!   kmerlr learn 4 8 foreground.fa background.fa model --lambda-auto=20
//!   kmerlr predict model.json sequences.fa
//!   kmerlr learn-scores fg.table bg.table model --lambda-auto=2
//!   kmerlr combine merged.json a.json b.json --summary mean

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use kmerlr_core::Summary;
use std::path::PathBuf;

mod config;
mod counts;
mod data;
mod evaluate;
mod genomic;
mod learn;
mod models;
mod options;
mod output;
mod predict;

use config::Settings;
use models::ModelKind;
use options::{KmerArgs, LearnArgs};

// ============================================================================
// CLI STRUCTURE
// ============================================================================

#[derive(Parser)]
#[command(name = "kmerlr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sparse L1 logistic regression on k-mer and score features", long_about = None)]
#[command(after_help = "Settings: ~/.kmerlr/config.toml (threads, seed)\nLogging: -v, -vv, -vvv or RUST_LOG")]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a k-mer model on foreground and background sequences
    ///
    /// Writes BASENAME.json, BASENAME_N<target>.json for several targets,
    /// BASENAME_trace.table and BASENAME_path.table with --save-trace, or
    /// BASENAME_predictions.table with --k-fold-cv.
    Learn {
        /// Minimum k-mer length
        m: usize,
        /// Maximum k-mer length
        n: usize,
        foreground: PathBuf,
        background: PathBuf,
        basename: PathBuf,
        #[command(flatten)]
        kmer: KmerArgs,
        #[command(flatten)]
        learn: LearnArgs,
    },

    /// Predict sequences with a k-mer model
    Predict {
        model: PathBuf,
        input: PathBuf,
        /// Output file. Omit for stdout.
        output: Option<PathBuf>,
    },

    /// Combine k-mer models
    Combine {
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// mean, min or max of coefficients; with --ensemble any of mean,
        /// product, min, max, none
        #[arg(long, default_value = "mean")]
        summary: Summary,
        /// Concatenate members instead of merging coefficients
        #[arg(long)]
        ensemble: bool,
    },

    /// List coefficients of a k-mer model by magnitude
    Coefficients {
        model: PathBuf,
        output: Option<PathBuf>,
    },

    /// Count k-mer classes in sequences
    CountFeatures {
        m: usize,
        n: usize,
        input: PathBuf,
        output: Option<PathBuf>,
        #[command(flatten)]
        kmer: KmerArgs,
    },

    /// Export the standardised feature matrix of sequences
    Export {
        model: PathBuf,
        input: PathBuf,
        output: PathBuf,
    },

    /// Loss and AUC of a k-mer model on labelled sequences
    Loss {
        model: PathBuf,
        foreground: PathBuf,
        background: PathBuf,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score sliding windows over a genome (wiggle output)
    PredictGenomic {
        model: PathBuf,
        genome: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "1000")]
        window_size: usize,
        #[arg(long, default_value = "100")]
        step_size: usize,
        /// Restrict to BED3 regions
        #[arg(long)]
        regions: Option<PathBuf>,
    },

    /// Cosine similarity of model coefficients
    Similarity {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Train a score model on foreground and background tables
    LearnScores {
        foreground: PathBuf,
        background: PathBuf,
        basename: PathBuf,
        #[command(flatten)]
        learn: LearnArgs,
    },

    /// Predict table rows with a score model
    PredictScores {
        model: PathBuf,
        input: PathBuf,
        output: Option<PathBuf>,
    },

    /// Combine score models
    CombineScores {
        output: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "mean")]
        summary: Summary,
        #[arg(long)]
        ensemble: bool,
    },

    /// Loss and AUC of a score model on labelled tables
    LossScores {
        model: PathBuf,
        foreground: PathBuf,
        background: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// List coefficients of a score model by magnitude
    CoefficientsScores {
        model: PathBuf,
        output: Option<PathBuf>,
    },

    /// Append all pairwise products to a score table
    ExpandScores {
        input: PathBuf,
        output: PathBuf,
    },
}

// ============================================================================
// MAIN
// ============================================================================

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version print to stdout and succeed
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Learn { m, n, foreground, background, basename, kmer, learn } => {
            let config = learn.trainer_config(&Settings::load()?)?;
            let kmer_config = kmer.kmer_config(m, n, config.cooccurrence)?;
            let data = data::load_kmer_training(kmer_config, &foreground, &background)?;
            learn::run(data, config, &basename, learn.report.as_deref())?;
        }
        Commands::LearnScores { foreground, background, basename, learn } => {
            let config = learn.trainer_config(&Settings::load()?)?;
            let data = data::load_score_training(&foreground, &background)?;
            learn::run(data, config, &basename, learn.report.as_deref())?;
        }
        Commands::Predict { model, input, output } => {
            predict::predict_sequences(&model, &input, output.as_deref())?;
        }
        Commands::PredictScores { model, input, output } => {
            predict::predict_scores(&model, &input, output.as_deref())?;
        }
        Commands::Combine { output, inputs, summary, ensemble } => {
            models::combine(ModelKind::Kmer, &output, &inputs, summary, ensemble)?;
        }
        Commands::CombineScores { output, inputs, summary, ensemble } => {
            models::combine(ModelKind::Scores, &output, &inputs, summary, ensemble)?;
        }
        Commands::Coefficients { model, output } => {
            models::coefficients(ModelKind::Kmer, &model, output.as_deref())?;
        }
        Commands::CoefficientsScores { model, output } => {
            models::coefficients(ModelKind::Scores, &model, output.as_deref())?;
        }
        Commands::CountFeatures { m, n, input, output, kmer } => {
            counts::count_features(kmer.kmer_config(m, n, false)?, &input, output.as_deref())?;
        }
        Commands::Export { model, input, output } => {
            predict::export(&model, &input, &output)?;
        }
        Commands::Loss { model, foreground, background, json } => {
            evaluate::loss_sequences(&model, &foreground, &background, json)?;
        }
        Commands::LossScores { model, foreground, background, json } => {
            evaluate::loss_scores(&model, &foreground, &background, json)?;
        }
        Commands::PredictGenomic { model, genome, output, window_size, step_size, regions } => {
            let windows = genomic::Windows {
                size: window_size,
                step: step_size,
            };
            genomic::predict_genomic(&model, &genome, &output, windows, regions.as_deref())?;
        }
        Commands::Similarity { inputs } => {
            models::similarity(&inputs)?;
        }
        Commands::ExpandScores { input, output } => {
            counts::expand_scores(&input, &output)?;
        }
    }

    Ok(())
}
