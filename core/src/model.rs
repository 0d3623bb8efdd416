//! Trained models
//!
//! An [`Ensemble`] is one or more logistic-regression classifiers sharing a
//! feature list and a transform, together with the feature catalog they
//! were trained over. A single classifier is an ensemble of one member
//! with [`Summary::None`].

use crate::coefficients::CoefficientSet;
use crate::constants::PROBABILITY_CLAMP;
use crate::encoder::CountEncoder;
use crate::features::{BaseKey, FeatureCatalog, FeatureIndices, FeatureKey};
use crate::io::DataError;
use crate::logreg::LogisticRegression;
use crate::sparse::SparseSample;
use crate::transform::StandardTransform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reduction of member predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Summary {
    Mean,
    /// Normalised product of member probabilities
    Product,
    Min,
    Max,
    /// Report every member
    #[default]
    None,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Summary::Mean => "mean",
            Summary::Product => "product",
            Summary::Min => "min",
            Summary::Max => "max",
            Summary::None => "none",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Summary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Summary::Mean),
            "product" => Ok(Summary::Product),
            "min" => Ok(Summary::Min),
            "max" => Ok(Summary::Max),
            "none" => Ok(Summary::None),
            _ => Err(format!(
                "unknown summary `{}` (expected mean, product, min, max or none)",
                s
            )),
        }
    }
}

impl Summary {
    /// Reduce member probabilities to one, or `None` for [`Summary::None`].
    pub fn reduce(&self, p: &[f64]) -> Option<f64> {
        if p.is_empty() {
            return None;
        }
        match self {
            Summary::Mean => Some(p.iter().sum::<f64>() / p.len() as f64),
            Summary::Min => p.iter().copied().reduce(f64::min),
            Summary::Max => p.iter().copied().reduce(f64::max),
            Summary::Product => {
                let clamped = p
                    .iter()
                    .map(|v| v.clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP));
                let (log_pos, log_neg) = clamped
                    .fold((0.0, 0.0), |(pos, neg), v| (pos + v.ln(), neg + (1.0 - v).ln()));
                // p1 / (p1 + p0) in log space
                Some(1.0 / (1.0 + (log_neg - log_pos).exp()))
            }
            Summary::None => None,
        }
    }

    /// Summarised prediction, or all members for [`Summary::None`].
    pub fn apply(&self, p: &[f64]) -> Vec<f64> {
        match self.reduce(p) {
            Some(v) => vec![v],
            None => p.to_vec(),
        }
    }
}

/// One or more classifiers over a shared feature list and transform.
#[derive(Debug, Clone)]
pub struct Ensemble {
    catalog: FeatureCatalog,
    features: FeatureIndices,
    transform: StandardTransform,
    summary: Summary,
    members: Vec<Vec<f64>>,
}

impl Ensemble {
    /// Validated ensemble.
    pub fn new(
        catalog: FeatureCatalog,
        features: FeatureIndices,
        transform: StandardTransform,
        summary: Summary,
        members: Vec<Vec<f64>>,
    ) -> Result<Self, DataError> {
        if members.is_empty() {
            return Err(DataError::EmptyData("model without classifiers".to_string()));
        }
        features.check_range(catalog.len())?;
        let dim = features.len() + 1;
        for theta in &members {
            if theta.len() != dim {
                return Err(DataError::DimensionMismatch {
                    expected: dim,
                    got: theta.len(),
                });
            }
        }
        if !transform.is_identity() && transform.len() != dim {
            return Err(DataError::DimensionMismatch {
                expected: dim,
                got: transform.len(),
            });
        }
        Ok(Self {
            catalog,
            features,
            transform,
            summary,
            members,
        })
    }

    /// Single classifier.
    pub fn single(
        catalog: FeatureCatalog,
        features: FeatureIndices,
        transform: StandardTransform,
        theta: Vec<f64>,
    ) -> Result<Self, DataError> {
        Self::new(catalog, features, transform, Summary::None, vec![theta])
    }

    /// `kmerLr` or `scoresLr`
    pub fn kind_name(&self) -> &'static str {
        if self.catalog.is_kmer() {
            "kmerLr"
        } else {
            "scoresLr"
        }
    }

    /// Distribution name, with the summary in brackets when one is set.
    pub fn name(&self) -> String {
        match self.summary {
            Summary::None => self.kind_name().to_string(),
            s => format!("{} [{}]", self.kind_name(), s),
        }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn features(&self) -> &FeatureIndices {
        &self.features
    }

    pub fn transform(&self) -> &StandardTransform {
        &self.transform
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn members(&self) -> &[Vec<f64>] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = summary;
        self
    }

    /// Identities of the active features, aligned to `θ[1:]`.
    pub fn feature_keys(&self) -> Vec<FeatureKey> {
        self.features
            .iter()
            .map(|f| self.catalog.feature_key(*f))
            .collect()
    }

    /// Encoder producing samples this ensemble can score.
    pub fn encoder(&self) -> Result<CountEncoder, DataError> {
        CountEncoder::new(self.features.clone(), self.catalog.len())
    }

    fn member(&self, i: usize) -> LogisticRegression<'_> {
        LogisticRegression::new(&self.members[i]).with_transform(&self.transform)
    }

    /// `p(y = 1 | x)` of every member for an encoded sample.
    pub fn predict_members(&self, x: &SparseSample) -> Vec<f64> {
        (0..self.len()).map(|i| self.member(i).predict(x)).collect()
    }

    /// Summarised prediction (all members for [`Summary::None`]).
    pub fn predict(&self, x: &SparseSample) -> Vec<f64> {
        self.summary.apply(&self.predict_members(x))
    }

    /// One probability per sample; the member mean stands in for
    /// [`Summary::None`].
    pub fn predict_probability(&self, x: &SparseSample) -> f64 {
        let p = self.predict_members(x);
        self.summary
            .reduce(&p)
            .or_else(|| Summary::Mean.reduce(&p))
            .unwrap_or(0.5)
    }

    /// Unweighted negative log-likelihood of labelled encoded samples.
    pub fn loss(&self, data: &[SparseSample]) -> Result<f64, DataError> {
        let mut total = 0.0;
        for (i, x) in data.iter().enumerate() {
            let y = x.label().ok_or(DataError::MissingLabel(i))?;
            total -= if self.len() == 1 {
                self.member(0).log_pdf(x, y)
            } else {
                let p = self.predict_probability(x);
                let q = if y { p } else { 1.0 - p };
                q.max(f64::MIN_POSITIVE).ln()
            };
        }
        Ok(total)
    }

    /// Unweighted negative log-likelihood of every member.
    pub fn member_losses(&self, data: &[SparseSample]) -> Result<Vec<f64>, DataError> {
        let mut totals = vec![0.0; self.len()];
        for (i, x) in data.iter().enumerate() {
            let y = x.label().ok_or(DataError::MissingLabel(i))?;
            for (m, total) in totals.iter_mut().enumerate() {
                *total -= self.member(m).log_pdf(x, y);
            }
        }
        Ok(totals)
    }

    /// Coefficients of member `i` keyed by feature identity.
    pub fn coefficients(&self, i: usize) -> CoefficientSet<BaseKey> {
        CoefficientSet::from_model(&self.features, &self.members[i], |j| self.catalog.key(j))
    }

    /// Mean coefficients over all members.
    pub fn mean_coefficients(&self) -> CoefficientSet<BaseKey> {
        let sets: Vec<CoefficientSet<BaseKey>> =
            (0..self.len()).map(|i| self.coefficients(i)).collect();
        CoefficientSet::mean_of(&sets)
    }

    /// Drop features that are zero in every member and base features no
    /// longer referenced.
    pub fn compact(self) -> Self {
        let keep: Vec<bool> = (1..=self.features.len())
            .map(|p| self.members.iter().any(|theta| theta[p] != 0.0))
            .collect();
        let mut slots = vec![0];
        slots.extend((1..=keep.len()).filter(|&p| keep[p - 1]));
        let features = FeatureIndices::new(
            self.features
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(f, _)| *f)
                .collect(),
        );
        let members = self
            .members
            .iter()
            .map(|theta| slots.iter().map(|&p| theta[p]).collect())
            .collect();
        let transform = self.transform.gather(&slots);
        let (catalog, features) = self.catalog.restrict(&features);
        Self {
            catalog,
            features,
            transform,
            summary: self.summary,
            members,
        }
    }
}
