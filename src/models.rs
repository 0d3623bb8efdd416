//! `combine`, `coefficients` and `similarity` (with their score variants)

use anyhow::{bail, Result};
use console::style;
use kmerlr_core::metrics::similarity_matrix;
use kmerlr_core::{
    combine_coefficients, combine_ensembles, save_model, BaseKey, Ensemble, FeatureCatalog, Summary,
};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::output;
use crate::predict::{load_kmer_model, load_score_model};

/// Which model family a command accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Kmer,
    Scores,
}

impl ModelKind {
    fn load(&self, path: &Path) -> Result<Ensemble> {
        match self {
            ModelKind::Kmer => load_kmer_model(path),
            ModelKind::Scores => load_score_model(path),
        }
    }

    fn load_all(&self, paths: &[PathBuf]) -> Result<Vec<Ensemble>> {
        paths.iter().map(|p| self.load(p)).collect()
    }
}

fn key_name(catalog: &FeatureCatalog, key: &BaseKey) -> String {
    match (catalog.index_of(key), key) {
        (Some(i), _) => catalog.name(i),
        (None, BaseKey::Column(c)) => format!("x{}", c),
        (None, BaseKey::Kmer(id)) => format!("{}:{}", id.k, id.code),
    }
}

fn entry_name(catalog: &FeatureCatalog, a: &BaseKey, b: &BaseKey) -> String {
    if a == b {
        key_name(catalog, a)
    } else {
        format!("{}:{}", key_name(catalog, a), key_name(catalog, b))
    }
}

pub fn combine(kind: ModelKind, out: &Path, inputs: &[PathBuf], summary: Summary, ensemble: bool) -> Result<()> {
    if inputs.is_empty() {
        bail!("no input models");
    }
    let models = kind.load_all(inputs)?;
    let combined = if ensemble {
        combine_ensembles(&models, summary)?
    } else {
        combine_coefficients(&models, summary)?
    };
    output::done(format!(
        "Combined {} models into {} ({} members, {} features)",
        models.len(),
        combined.name(),
        combined.len(),
        combined.features().len()
    ));
    save_model(out, &combined)?;
    output::saved(out);
    Ok(())
}

/// `(name, value)` rows sorted by decreasing magnitude, intercept first.
pub fn coefficient_table(model: &Ensemble) -> Vec<(String, f64)> {
    let coefficients = model.mean_coefficients();
    let mut rows = vec![("(intercept)".to_string(), coefficients.offset)];
    rows.extend(
        coefficients
            .ranked()
            .into_iter()
            .map(|(a, b, v)| (entry_name(model.catalog(), &a, &b), v)),
    );
    rows
}

pub fn coefficients(kind: ModelKind, model: &Path, out: Option<&Path>) -> Result<()> {
    let model = kind.load(model)?;
    let mut w = output::writer(out)?;
    for (name, value) in coefficient_table(&model) {
        writeln!(w, "{} {}", name, value)?;
    }
    w.flush()?;
    Ok(())
}

/// Cosine similarity of mean coefficient vectors over the union of features.
pub fn similarity_of(models: &[Ensemble]) -> Result<Vec<Vec<f64>>> {
    if let Some(first) = models.first() {
        for model in &models[1..] {
            first.catalog().check_compatible(model.catalog())?;
        }
    }
    let sets: Vec<_> = models.iter().map(|m| m.mean_coefficients()).collect();
    let union: BTreeSet<(BaseKey, BaseKey)> = sets
        .iter()
        .flat_map(|s| s.entries().map(|(a, b, _)| (a, b)))
        .collect();
    let vectors: Vec<Vec<f64>> = sets
        .iter()
        .map(|s| {
            union
                .iter()
                .map(|(a, b)| if a == b { s.get(a) } else { s.get_pair(a, b) })
                .collect()
        })
        .collect();
    Ok(similarity_matrix(&vectors))
}

pub fn similarity(inputs: &[PathBuf]) -> Result<()> {
    if inputs.is_empty() {
        bail!("no input models");
    }
    let models: Vec<Ensemble> = inputs
        .iter()
        .map(|p| {
            kmerlr_core::load_model(p)
                .map_err(|e| anyhow::anyhow!("Failed to load model {}: {}", p.display(), e))
        })
        .collect::<Result<_>>()?;
    let matrix = similarity_of(&models)?;

    let names: Vec<String> = inputs
        .iter()
        .map(|p| {
            p.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect();
    println!("{}", style(names.join(" ")).bold());
    for (name, row) in names.iter().zip(&matrix) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:.4}", v)).collect();
        println!("{} {}", name, cells.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmerlr_core::{load_model, Feature, FeatureIndices, StandardTransform};

    fn score_model(theta: Vec<f64>) -> Ensemble {
        Ensemble::single(
            FeatureCatalog::Scores { n_columns: 4 },
            FeatureIndices::new(vec![Feature::single(0), Feature::single(3), Feature::pair(0, 3)]),
            StandardTransform::identity(),
            theta,
        )
        .unwrap()
    }

    #[test]
    fn test_coefficient_table_ranked() {
        // θ follows the sorted features (0,0), (0,3), (3,3)
        let table = coefficient_table(&score_model(vec![0.5, 0.1, -2.0, 1.0]));
        assert_eq!(table[0], ("(intercept)".to_string(), 0.5));
        assert_eq!(table[1], ("x0:x3".to_string(), -2.0));
        assert_eq!(table[2], ("x3".to_string(), 1.0));
        assert_eq!(table[3], ("x0".to_string(), 0.1));
    }

    #[test]
    fn test_similarity_of() {
        let a = score_model(vec![0.0, 1.0, 0.0, 0.0]);
        let b = score_model(vec![0.0, 2.0, 0.0, 0.0]);
        let c = score_model(vec![0.0, 0.0, 1.0, 0.0]);
        let m = similarity_of(&[a, b, c]).unwrap();
        assert!((m[0][1] - 1.0).abs() < 1e-12);
        assert!(m[0][2].abs() < 1e-12);
    }

    #[test]
    fn test_combine_identical_models() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.json");
        save_model(&input, &score_model(vec![0.5, 0.1, -2.0, 1.0])).unwrap();
        let out = dir.path().join("c.json");

        combine(ModelKind::Scores, &out, &[input.clone(), input.clone()], Summary::Mean, false).unwrap();
        let combined = load_model(&out).unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined.members()[0], vec![0.5, 0.1, -2.0, 1.0]);

        combine(ModelKind::Scores, &out, &[input.clone(), input.clone()], Summary::Max, true).unwrap();
        let combined = load_model(&out).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.name(), "scoresLr [max]");

        assert!(combine(ModelKind::Scores, &out, &[input.clone()], Summary::Product, false).is_err());
        assert!(combine(ModelKind::Kmer, &out, &[input], Summary::Mean, false).is_err());
    }
}
