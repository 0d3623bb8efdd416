//! `loss` and `loss-scores`
//!
//! Evaluates a trained model on a labelled foreground/background pair.
//!
//! ```bash
//! kmerlr loss model.json foreground.fa background.fa
//! kmerlr loss-scores --json model.json fg.table bg.table
//! ```

use anyhow::Result;
use console::style;
use kmerlr_core::{Ensemble, EvaluationMetrics, SparseSample};
use serde::Serialize;
use std::path::Path;

use crate::data;
use crate::predict::{load_kmer_model, load_score_model};

/// Evaluation output
#[derive(Debug, Serialize)]
pub struct LossResult {
    pub model: String,
    pub members: usize,
    pub features: usize,
    #[serde(flatten)]
    pub metrics: EvaluationMetrics,
}

impl LossResult {
    pub fn compute(model: &Ensemble, samples: &[SparseSample]) -> Result<Self> {
        Ok(Self {
            model: model.name(),
            members: model.len(),
            features: model.features().len(),
            metrics: EvaluationMetrics::compute(model, samples)?,
        })
    }

    pub fn print(&self) {
        let m = &self.metrics;
        println!("{}", style(format!("{} ({} members, {} features)", self.model, self.members, self.features)).bold());
        println!("  Samples:   {} ({} foreground)", m.n_samples, m.n_positive);
        println!("  Loss:      {}", m.loss);
        println!("  Mean loss: {}", m.mean_loss);
        println!("  AUC:       {:.4}", m.auc);
        println!("  Accuracy:  {:.4}", m.accuracy);
    }

    fn emit(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            self.print();
        }
        Ok(())
    }
}

pub fn loss_sequences(model: &Path, foreground: &Path, background: &Path, json: bool) -> Result<()> {
    let model = load_kmer_model(model)?;
    let samples = data::labelled_sequences(&model, foreground, background)?;
    LossResult::compute(&model, &samples)?.emit(json)
}

pub fn loss_scores(model: &Path, foreground: &Path, background: &Path, json: bool) -> Result<()> {
    let model = load_score_model(model)?;
    let samples = data::labelled_scores(&model, foreground, background)?;
    LossResult::compute(&model, &samples)?.emit(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmerlr_core::{Feature, FeatureCatalog, FeatureIndices, StandardTransform};

    #[test]
    fn test_loss_result_json() {
        let model = Ensemble::single(
            FeatureCatalog::Scores { n_columns: 1 },
            FeatureIndices::new(vec![Feature::single(0)]),
            StandardTransform::identity(),
            vec![0.0, 0.0],
        )
        .unwrap();
        let encoder = model.encoder().unwrap();
        let samples = vec![
            encoder.encode_dense(&[1.0], Some(true)).unwrap(),
            encoder.encode_dense(&[0.0], Some(false)).unwrap(),
        ];
        let result = LossResult::compute(&model, &samples).unwrap();
        assert!((result.metrics.loss - 2.0 * 2f64.ln()).abs() < 1e-12);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["model"], "scoresLr");
        assert_eq!(json["n_samples"], 2);
        assert!(json["mean_loss"].as_f64().is_some());
    }
}
