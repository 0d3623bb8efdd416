//! Combining trained models
//!
//! Two ways are supported:
//!
//! - [`combine_coefficients`] merges all classifiers into one by taking
//!   the mean, minimum or maximum of their coefficients per feature
//! - [`combine_ensembles`] concatenates the members of several ensembles
//!   over the union of their features
//!
//! Both require the models to come from the same feature universe and
//! their transforms to agree on shared features.

use crate::coefficients::CoefficientSet;
use crate::features::{BaseKey, Feature, FeatureCatalog, FeatureIndices, FeatureKey};
use crate::model::{Ensemble, Summary};
use crate::transform::StandardTransform;
use std::collections::BTreeSet;
use thiserror::Error;

/// Models that cannot be combined
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IncompatibleError {
    #[error("transforms disagree: {0}")]
    Transform(String),

    #[error("k-mer configurations differ: {0}")]
    Alphabet(String),

    #[error("invalid k-mer configuration: {0}")]
    Configuration(String),

    #[error("cannot mix k-mer and score models")]
    ModelType,

    #[error("summary `{0}` cannot combine coefficients (use mean, min or max)")]
    IllegalSummary(Summary),

    #[error("ensemble summary `{found}` differs from requested `{requested}`")]
    SummaryMismatch { found: Summary, requested: Summary },

    #[error("no models to combine")]
    Empty,
}

fn check_catalogs(models: &[Ensemble]) -> Result<&FeatureCatalog, IncompatibleError> {
    let first = models.first().ok_or(IncompatibleError::Empty)?;
    for model in &models[1..] {
        first.catalog().check_compatible(model.catalog())?;
    }
    Ok(first.catalog())
}

/// Catalog over exactly the base features in `keys`.
fn union_catalog(
    base: &FeatureCatalog,
    keys: impl IntoIterator<Item = BaseKey>,
) -> Result<FeatureCatalog, IncompatibleError> {
    let keys: BTreeSet<BaseKey> = keys.into_iter().collect();
    base.with_keys(&keys.into_iter().collect::<Vec<_>>())
}

fn lookup(catalog: &FeatureCatalog, key: &BaseKey) -> Result<usize, IncompatibleError> {
    catalog.index_of(key).ok_or(IncompatibleError::ModelType)
}

fn merged_transform(
    models: &[Ensemble],
    target: &[FeatureKey],
) -> Result<StandardTransform, IncompatibleError> {
    let keys: Vec<Vec<FeatureKey>> = models.iter().map(|m| m.feature_keys()).collect();
    let parts: Vec<(&StandardTransform, &[FeatureKey])> = models
        .iter()
        .zip(&keys)
        .map(|(m, k)| (m.transform(), k.as_slice()))
        .collect();
    StandardTransform::merge(&parts, target)
}

fn build(
    catalog: FeatureCatalog,
    features: FeatureIndices,
    transform: StandardTransform,
    summary: Summary,
    members: Vec<Vec<f64>>,
) -> Result<Ensemble, IncompatibleError> {
    Ensemble::new(catalog, features, transform, summary, members)
        .map_err(|e| IncompatibleError::Configuration(e.to_string()))
}

/// Merge every classifier of `models` into a single classifier.
///
/// `summary` must be mean, min or max. Min and max compare magnitudes and
/// keep the sign of the selected coefficient; a feature missing from a
/// classifier counts as zero.
pub fn combine_coefficients(
    models: &[Ensemble],
    summary: Summary,
) -> Result<Ensemble, IncompatibleError> {
    if !matches!(summary, Summary::Mean | Summary::Min | Summary::Max) {
        return Err(IncompatibleError::IllegalSummary(summary));
    }
    let base = check_catalogs(models)?;

    let sets: Vec<CoefficientSet<BaseKey>> = models
        .iter()
        .flat_map(|m| (0..m.len()).map(move |i| m.coefficients(i)))
        .collect();
    let mut combined = match summary {
        Summary::Mean => CoefficientSet::mean_of(&sets),
        _ => {
            let mut acc = sets[0].clone();
            for set in &sets[1..] {
                if summary == Summary::Max {
                    acc.max_all(set);
                } else {
                    acc.min_all(set);
                }
            }
            acc
        }
    };
    combined.sparsify();

    let catalog = union_catalog(base, combined.base_keys())?;
    let (features, theta) = combined.to_model(|k| lookup(&catalog, k))?;
    let target: Vec<FeatureKey> = features.iter().map(|f| catalog.feature_key(*f)).collect();
    let transform = merged_transform(models, &target)?;
    log::info!(
        "combined {} classifiers ({}) into {} features",
        sets.len(),
        summary,
        features.len()
    );
    build(catalog, features, transform, Summary::None, vec![theta])
}

/// Concatenate the members of `models` into one ensemble with `summary`.
///
/// Ensembles of more than one member must already use `summary` (or none).
pub fn combine_ensembles(
    models: &[Ensemble],
    summary: Summary,
) -> Result<Ensemble, IncompatibleError> {
    let base = check_catalogs(models)?;
    for model in models {
        let found = model.summary();
        if model.len() > 1 && found != Summary::None && found != summary {
            return Err(IncompatibleError::SummaryMismatch {
                found,
                requested: summary,
            });
        }
    }

    let keys: BTreeSet<FeatureKey> = models.iter().flat_map(|m| m.feature_keys()).collect();
    let catalog = union_catalog(base, keys.iter().flat_map(|(a, b)| [*a, *b]))?;
    let mut union = Vec::with_capacity(keys.len());
    for (a, b) in &keys {
        union.push(Feature::pair(lookup(&catalog, a)?, lookup(&catalog, b)?));
    }
    let features = FeatureIndices::new(union);

    let mut members = Vec::new();
    for model in models {
        let positions: Vec<usize> = model
            .features()
            .iter()
            .map(|f| {
                let (a, b) = model.catalog().feature_key(*f);
                let target = Feature::pair(lookup(&catalog, &a)?, lookup(&catalog, &b)?);
                features
                    .position(target)
                    .ok_or_else(|| IncompatibleError::Configuration(format!("lost feature {}", target)))
            })
            .collect::<Result<_, _>>()?;
        for theta in model.members() {
            let mut aligned = vec![0.0; features.len() + 1];
            aligned[0] = theta[0];
            for (p, &q) in positions.iter().enumerate() {
                aligned[q] = theta[p + 1];
            }
            members.push(aligned);
        }
    }

    let target: Vec<FeatureKey> = features.iter().map(|f| catalog.feature_key(*f)).collect();
    let transform = merged_transform(models, &target)?;
    log::info!(
        "merged {} ensembles into {} members over {} features",
        models.len(),
        members.len(),
        features.len()
    );
    build(catalog, features, transform, summary, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{Alphabet, KmerConfig, KmerCounter};

    fn scores(features: &[usize], members: Vec<Vec<f64>>, transform: StandardTransform) -> Ensemble {
        Ensemble::new(
            FeatureCatalog::Scores { n_columns: 5 },
            FeatureIndices::new(features.iter().map(|&i| Feature::single(i)).collect()),
            transform,
            if members.len() > 1 { Summary::Mean } else { Summary::None },
            members,
        )
        .unwrap()
    }

    fn kmer_model(revcomp: bool) -> Ensemble {
        let config = KmerConfig::new(Alphabet::Nucleotide, 2, 2).with_revcomp(revcomp);
        let counter = KmerCounter::new(config.clone()).unwrap();
        let classes = vec![counter.parse_class("ac").unwrap(), counter.parse_class("gg").unwrap()];
        Ensemble::single(
            FeatureCatalog::from_kmer_classes(config, classes),
            FeatureIndices::diagonal(2),
            StandardTransform::identity(),
            vec![0.0, 1.0, -1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_mean_of_identical_ensembles_is_exact() {
        let theta = vec![0.1, 1.0 / 3.0, -2.0 / 7.0];
        let transform = StandardTransform::from_parts(vec![0.0, 0.3, 0.7], vec![1.0, 1.1, 0.9]);
        let model = scores(&[1, 3], vec![theta.clone(); 3], transform.clone());
        let combined = combine_coefficients(&[model.clone(), model], Summary::Mean).unwrap();
        assert_eq!(combined.members(), &[theta]);
        assert_eq!(combined.transform(), &transform);
    }

    #[test]
    fn test_max_keeps_larger_magnitude() {
        let a = scores(&[0, 1], vec![vec![0.0, 1.0, -3.0]], StandardTransform::identity());
        let b = scores(&[1, 2], vec![vec![1.0, 2.0, 0.5]], StandardTransform::identity());
        let combined = combine_coefficients(&[a.clone(), b.clone()], Summary::Max).unwrap();
        assert_eq!(combined.features(), &FeatureIndices::diagonal(3));
        assert_eq!(combined.members()[0], vec![1.0, 1.0, -3.0, 0.5]);

        let combined = combine_coefficients(&[a, b], Summary::Min).unwrap();
        assert_eq!(combined.features().as_slice(), &[Feature::single(1)]);
        assert_eq!(combined.members()[0], vec![0.0, 2.0]);
    }

    #[test]
    fn test_product_rejected_for_coefficients() {
        let a = scores(&[0], vec![vec![0.0, 1.0]], StandardTransform::identity());
        assert_eq!(
            combine_coefficients(&[a], Summary::Product).unwrap_err(),
            IncompatibleError::IllegalSummary(Summary::Product)
        );
        assert_eq!(
            combine_coefficients(&[], Summary::Mean).unwrap_err(),
            IncompatibleError::Empty
        );
    }

    #[test]
    fn test_transform_disagreement() {
        let a = scores(
            &[0],
            vec![vec![0.0, 1.0]],
            StandardTransform::from_parts(vec![0.0, 1.0], vec![1.0, 2.0]),
        );
        let b = scores(
            &[0],
            vec![vec![0.0, 1.0]],
            StandardTransform::from_parts(vec![0.0, 1.5], vec![1.0, 2.0]),
        );
        assert!(matches!(
            combine_ensembles(&[a, b], Summary::Mean),
            Err(IncompatibleError::Transform(_))
        ));
    }

    #[test]
    fn test_merge_identical_ensembles() {
        let theta = vec![-0.2, 0.7, 1.3];
        let model = scores(&[0, 4], vec![theta.clone(); 3], StandardTransform::identity());
        let merged = combine_ensembles(&[model.clone(), model], Summary::Mean).unwrap();
        assert_eq!(merged.len(), 6);
        assert!(merged.members().iter().all(|m| *m == theta));
        assert_eq!(merged.name(), "scoresLr [mean]");
    }

    #[test]
    fn test_ensembles_aligned_to_union() {
        let a = scores(&[0], vec![vec![0.5, 1.0]], StandardTransform::identity());
        let b = scores(&[3], vec![vec![-0.5, 2.0]], StandardTransform::identity());
        let merged = combine_ensembles(&[a, b], Summary::Product).unwrap();
        assert_eq!(
            merged.features().as_slice(),
            &[Feature::single(0), Feature::single(3)]
        );
        assert_eq!(merged.members(), &[vec![0.5, 1.0, 0.0], vec![-0.5, 0.0, 2.0]]);
        assert_eq!(merged.summary(), Summary::Product);
    }

    #[test]
    fn test_summary_mismatch() {
        let model = scores(&[0], vec![vec![0.0, 1.0]; 2], StandardTransform::identity());
        assert!(matches!(
            combine_ensembles(&[model], Summary::Max),
            Err(IncompatibleError::SummaryMismatch { .. })
        ));
    }

    #[test]
    fn test_kmer_and_alphabet_checks() {
        let a = kmer_model(true);
        let b = kmer_model(false);
        assert!(matches!(
            combine_coefficients(&[a.clone(), b], Summary::Mean),
            Err(IncompatibleError::Alphabet(_))
        ));
        let s = scores(&[0], vec![vec![0.0, 1.0]], StandardTransform::identity());
        assert_eq!(
            combine_ensembles(&[a.clone(), s], Summary::Mean).unwrap_err(),
            IncompatibleError::ModelType
        );
        let merged = combine_coefficients(&[a.clone(), a], Summary::Mean).unwrap();
        assert_eq!(merged.catalog().len(), 2);
        assert_eq!(merged.members()[0], vec![0.0, 1.0, -1.0]);
    }
}
