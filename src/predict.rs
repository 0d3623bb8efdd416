//! `predict`, `predict-scores` and `export`

use anyhow::Result;
use kmerlr_core::io::write_score_table;
use kmerlr_core::{load_model, Ensemble, SparseSample};
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;

use crate::data;
use crate::output;

fn load(path: &Path) -> Result<Ensemble> {
    let model = load_model(path)
        .map_err(|e| anyhow::anyhow!("Failed to load model {}: {}", path.display(), e))?;
    log::info!(
        "{}: {} members, {} features",
        model.name(),
        model.len(),
        model.features().len()
    );
    Ok(model)
}

pub(crate) fn load_kmer_model(path: &Path) -> Result<Ensemble> {
    let model = load(path)?;
    data::require_kmer_model(&model)?;
    Ok(model)
}

pub(crate) fn load_score_model(path: &Path) -> Result<Ensemble> {
    let model = load(path)?;
    data::require_score_model(&model)?;
    Ok(model)
}

fn write_predictions(model: &Ensemble, names: &[String], samples: &[SparseSample], out: Option<&Path>) -> Result<()> {
    let predictions: Vec<Vec<f64>> = samples.par_iter().map(|x| model.predict(x)).collect();
    let mut w = output::writer(out)?;
    for (name, p) in names.iter().zip(&predictions) {
        writeln!(w, "{} {}", name, output::join_values(p))?;
    }
    w.flush()?;
    if let Some(out) = out {
        output::saved(out);
    }
    Ok(())
}

pub fn predict_sequences(model: &Path, input: &Path, out: Option<&Path>) -> Result<()> {
    let model = load_kmer_model(model)?;
    let records = data::read_sequences(input)?;
    let samples = data::encode_sequences(&model, &records, None)?;
    let names: Vec<String> = records.into_iter().map(|r| r.name).collect();
    write_predictions(&model, &names, &samples, out)
}

pub fn predict_scores(model: &Path, input: &Path, out: Option<&Path>) -> Result<()> {
    let model = load_score_model(model)?;
    let table = data::read_scores(input)?;
    let samples = data::encode_scores(&model, &table, None)?;
    let names: Vec<String> = table
        .names
        .iter()
        .enumerate()
        .map(|(i, n)| n.clone().unwrap_or_else(|| (i + 1).to_string()))
        .collect();
    write_predictions(&model, &names, &samples, out)
}

/// Transformed values of every active feature, one row per sample.
pub fn feature_matrix(model: &Ensemble, samples: &[SparseSample]) -> (Vec<String>, Vec<Vec<f64>>) {
    let catalog = model.catalog();
    let header = model
        .features()
        .iter()
        .map(|f| catalog.feature_name(*f))
        .collect();
    let transform = model.transform();
    let rows = samples
        .iter()
        .map(|x| {
            (1..=model.features().len())
                .map(|p| transform.apply(x.value(p), p))
                .collect()
        })
        .collect();
    (header, rows)
}

pub fn export(model: &Path, input: &Path, out: &Path) -> Result<()> {
    let model = load_kmer_model(model)?;
    let records = data::read_sequences(input)?;
    let samples = data::encode_sequences(&model, &records, None)?;
    let (header, rows) = feature_matrix(&model, &samples);
    let w = output::writer(Some(out))?;
    write_score_table(w, Some(&header), &rows)?;
    output::saved(out);
    Ok(())
}
