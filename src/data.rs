//! Loading training and prediction data
//!
//! Sequences are counted in parallel and encoded over the base k-mer
//! universe for training, or over a model's active features for
//! prediction. Score tables are encoded row by row.

use anyhow::{bail, Context, Result};
use kmerlr_core::io::{read_fasta_file, read_score_table_file, FastaRecord, ScoreTable};
use kmerlr_core::{
    CountEncoder, Ensemble, FeatureCatalog, KmerConfig, KmerCounter, KmerCounts, SparseSample,
};
use rayon::prelude::*;
use std::path::Path;

use crate::output;

/// Labelled samples over a base feature universe
pub struct TrainingData {
    pub catalog: FeatureCatalog,
    pub samples: Vec<SparseSample>,
    pub n_positive: usize,
}

pub fn read_sequences(path: &Path) -> Result<Vec<FastaRecord>> {
    let records =
        read_fasta_file(path).with_context(|| format!("Failed to read {}", path.display()))?;
    log::info!("read {} sequences from {}", records.len(), path.display());
    Ok(records)
}

pub fn read_scores(path: &Path) -> Result<ScoreTable> {
    let table = read_score_table_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    log::info!(
        "read {} rows x {} columns from {}",
        table.len(),
        table.n_columns,
        path.display()
    );
    Ok(table)
}

/// Count k-mer classes of every sequence.
pub fn count_sequences(counter: &KmerCounter, records: &[FastaRecord], message: &str) -> Vec<KmerCounts> {
    let pb = output::progress(records.len(), message);
    let counts = records
        .par_iter()
        .map(|r| {
            let c = counter.count(&r.sequence);
            pb.inc(1);
            c
        })
        .collect();
    pb.finish_and_clear();
    counts
}

/// Count foreground and background sequences and encode them over every
/// class that occurs.
pub fn load_kmer_training(config: KmerConfig, foreground: &Path, background: &Path) -> Result<TrainingData> {
    let counter = KmerCounter::new(config)?;
    let fg = read_sequences(foreground)?;
    let bg = read_sequences(background)?;
    if fg.is_empty() || bg.is_empty() {
        bail!("foreground and background must both contain sequences");
    }

    let mut counts = count_sequences(&counter, &fg, "Counting foreground");
    counts.extend(count_sequences(&counter, &bg, "Counting background"));
    let catalog = FeatureCatalog::from_kmer_counts(&counter, &counts);

    let encoder = CountEncoder::generating(catalog.len());
    let samples = counts
        .iter()
        .enumerate()
        .map(|(i, c)| encoder.encode(&catalog.counts_from_kmers(c), Some(i < fg.len())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TrainingData {
        catalog,
        samples,
        n_positive: fg.len(),
    })
}

/// Read foreground and background score tables.
pub fn load_score_training(foreground: &Path, background: &Path) -> Result<TrainingData> {
    let fg = read_scores(foreground)?;
    let bg = read_scores(background)?;
    if fg.is_empty() || bg.is_empty() {
        bail!("foreground and background must both contain rows");
    }
    if fg.n_columns != bg.n_columns {
        bail!(
            "foreground has {} columns but background has {}",
            fg.n_columns,
            bg.n_columns
        );
    }

    let encoder = CountEncoder::generating(fg.n_columns);
    let samples = fg
        .rows
        .iter()
        .map(|row| encoder.encode_dense(row, Some(true)))
        .chain(bg.rows.iter().map(|row| encoder.encode_dense(row, Some(false))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TrainingData {
        catalog: FeatureCatalog::Scores {
            n_columns: fg.n_columns,
        },
        samples,
        n_positive: fg.len(),
    })
}

pub fn require_kmer_model(model: &Ensemble) -> Result<KmerCounter> {
    match model.catalog().kmer_config() {
        Some(config) => Ok(KmerCounter::new(config.clone())?),
        None => bail!("{} is not a k-mer model", model.name()),
    }
}

pub fn require_score_model(model: &Ensemble) -> Result<()> {
    if model.catalog().is_kmer() {
        bail!("{} is not a score model", model.name());
    }
    Ok(())
}

/// Encode sequences over a k-mer model's active features.
pub fn encode_sequences(
    model: &Ensemble,
    records: &[FastaRecord],
    label: Option<bool>,
) -> Result<Vec<SparseSample>> {
    let counter = require_kmer_model(model)?;
    let encoder = model.encoder()?;
    let counts = count_sequences(&counter, records, "Counting");
    let samples = counts
        .iter()
        .map(|c| encoder.encode(&model.catalog().counts_from_kmers(c), label))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(samples)
}

/// Encode score rows over a score model's active features.
pub fn encode_scores(model: &Ensemble, table: &ScoreTable, label: Option<bool>) -> Result<Vec<SparseSample>> {
    require_score_model(model)?;
    let encoder = model.encoder()?;
    let samples = table
        .rows
        .iter()
        .map(|row| encoder.encode_dense(row, label))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(samples)
}

/// Labelled samples of a foreground/background pair for a trained model.
pub fn labelled_sequences(model: &Ensemble, foreground: &Path, background: &Path) -> Result<Vec<SparseSample>> {
    let mut samples = encode_sequences(model, &read_sequences(foreground)?, Some(true))?;
    samples.extend(encode_sequences(model, &read_sequences(background)?, Some(false))?);
    Ok(samples)
}

pub fn labelled_scores(model: &Ensemble, foreground: &Path, background: &Path) -> Result<Vec<SparseSample>> {
    let mut samples = encode_scores(model, &read_scores(foreground)?, Some(true))?;
    samples.extend(encode_scores(model, &read_scores(background)?, Some(false))?);
    Ok(samples)
}
