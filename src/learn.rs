//! `learn` and `learn-scores`
//!
//! Trains an ensemble and writes `BASENAME.json`. With several λ targets
//! every candidate is also written as `BASENAME_N{target}.json`. With
//! `--save-trace` the optimisation trace and regularisation path are written
//! next to it; with `--k-fold-cv` only out-of-fold predictions are written.

use anyhow::Result;
use console::style;
use kmerlr_core::training::EnsembleTrainer;
use kmerlr_core::{save_model, TrainerConfig};
use std::path::Path;
use std::time::Instant;

use crate::data::TrainingData;
use crate::output::{self, suffixed};

pub fn run(data: TrainingData, config: TrainerConfig, basename: &Path, report: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let n = data.samples.len();
    output::step(format!(
        "{} samples ({} foreground, {} background), {} base features",
        n,
        data.n_positive,
        n - data.n_positive,
        data.catalog.len()
    ));
    log::debug!("training configuration: {:?}", config);

    let trainer = EnsembleTrainer::from_config(config.clone())?;

    if config.k_fold_cv > 0 {
        let cv = trainer.cross_validate(&data.catalog, &data.samples, config.k_fold_cv)?;
        let path = suffixed(basename, "_predictions.table");
        output::write_file(&path, |w| cv.write(w))?;
        output::done(format!(
            "{}-fold cross-validation AUC: {:.4}",
            config.k_fold_cv,
            cv.auc()
        ));
        output::saved(&path);
        if let Some(report) = report {
            std::fs::write(report, serde_json::to_string_pretty(&cv.reports)?)?;
            output::saved(report);
        }
        return Ok(());
    }

    let result = trainer.train(&data.catalog, &data.samples, &[])?;

    if config.save_trace {
        let trace = suffixed(basename, "_trace.table");
        output::write_file(&trace, |w| result.trace.write(w))?;
        output::saved(&trace);
        let path = suffixed(basename, "_path.table");
        output::write_file(&path, |w| result.path.write(w))?;
        output::saved(&path);
    }

    if result.candidates.len() > 1 {
        for candidate in &result.candidates {
            if let Some(target) = candidate.mode.target() {
                let path = suffixed(basename, &format!("_N{}.json", target));
                save_model(&path, &candidate.model.clone().compact())?;
                output::saved(&path);
            }
        }
    }

    for rec in &result.report.recommendations {
        match rec.level.as_str() {
            "info" => log::info!("{}", rec.message),
            _ => output::warn(&rec.message),
        }
    }
    let summary = result.report.summary();
    if let Some(report) = report {
        std::fs::write(report, result.report.to_json()?)?;
        output::saved(report);
    }

    let model = result.into_model().compact();
    let path = suffixed(basename, ".json");
    save_model(&path, &model)?;

    output::done(format!(
        "{} in {:.1}s: {} features",
        summary,
        start.elapsed().as_secs_f64(),
        model.features().len()
    ));
    output::saved(&path);
    eprintln!("{}", style("Training complete").bold().green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_score_training;
    use kmerlr_core::load_model;
    use std::fs;

    fn write_tables(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let fg = dir.join("fg.table");
        let bg = dir.join("bg.table");
        let mut fg_rows = String::new();
        let mut bg_rows = String::new();
        for i in 0..20 {
            let noise = (i % 5) as f64 * 0.1;
            fg_rows.push_str(&format!("{},{},0.5\n", 2.0 + noise, 1.0 - noise));
            bg_rows.push_str(&format!("{},{},0.5\n", 0.5 + noise, 1.0 + noise));
        }
        fs::write(&fg, fg_rows).unwrap();
        fs::write(&bg, bg_rows).unwrap();
        (fg, bg)
    }

    fn config() -> TrainerConfig {
        TrainerConfig::default()
            .with_threads(1)
            .with_max_iterations(200)
    }

    #[test]
    fn test_learn_writes_models_and_trace() {
        let dir = tempfile::tempdir().unwrap();
        let (fg, bg) = write_tables(dir.path());
        let data = load_score_training(&fg, &bg).unwrap();
        let basename = dir.path().join("model");
        let report = dir.path().join("report.json");

        let mut config = config().with_lambda_auto(vec![1, 2]);
        config.save_trace = true;
        run(data, config, &basename, Some(&report)).unwrap();

        let model = load_model(dir.path().join("model.json")).unwrap();
        assert_eq!(model.kind_name(), "scoresLr");
        assert!(model.features().len() <= 2);
        assert!(dir.path().join("model_N1.json").exists());
        assert!(dir.path().join("model_N2.json").exists());

        let trace = fs::read_to_string(dir.path().join("model_trace.table")).unwrap();
        assert!(trace.starts_with("duration iteration change nonzero"));
        let path = fs::read_to_string(dir.path().join("model_path.table")).unwrap();
        assert!(path.lines().next().unwrap().ends_with("lambda norm theta"));
        assert!(fs::read_to_string(&report).unwrap().contains("\"model_kind\": \"scoresLr\""));
    }

    #[test]
    fn test_learn_cross_validation() {
        let dir = tempfile::tempdir().unwrap();
        let (fg, bg) = write_tables(dir.path());
        let data = load_score_training(&fg, &bg).unwrap();
        let basename = dir.path().join("cv");

        let mut config = config().with_lambda_auto(vec![1]);
        config.k_fold_cv = 4;
        run(data, config, &basename, None).unwrap();

        let table = fs::read_to_string(dir.path().join("cv_predictions.table")).unwrap();
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("fold label prediction"));
        assert_eq!(lines.count(), 40);
        assert!(!dir.path().join("cv.json").exists());
    }
}
