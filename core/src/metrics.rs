//! Evaluation metrics
//!
//! Provides metrics for judging trained classifiers:
//! - ROC AUC: rank based, ties share their average rank
//! - Log loss: negative log-likelihood of the labels
//! - Cosine similarity: agreement of coefficient vectors

use crate::io::DataError;
use crate::model::Ensemble;
use crate::sparse::SparseSample;
use serde::{Deserialize, Serialize};

/// Compute cosine similarity between two vectors
///
/// Returns value in range [-1, 1] where 1 is identical direction.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same length");

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a < 1e-12 || norm_b < 1e-12 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Symmetric matrix of pairwise cosine similarities
pub fn similarity_matrix(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut m = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let s = cosine_similarity(&vectors[i], &vectors[j]);
            m[i][j] = s;
            m[j][i] = s;
        }
    }
    m
}

/// Area under the ROC curve
///
/// Mann-Whitney statistic of the positive scores' ranks. NaN if one of
/// the classes is empty.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    debug_assert_eq!(scores.len(), labels.len());
    let n_pos = labels.iter().filter(|&&y| y).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // average ranks (1-based) over runs of ties
    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        rank_sum += order[start..end]
            .iter()
            .filter(|&&i| labels[i])
            .count() as f64
            * rank;
        start = end;
    }

    let n_pos = n_pos as f64;
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

/// Mean negative log-likelihood of `labels` under `probabilities`
pub fn log_loss(probabilities: &[f64], labels: &[bool]) -> f64 {
    debug_assert_eq!(probabilities.len(), labels.len());
    if probabilities.is_empty() {
        return 0.0;
    }
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &y)| {
            let q = if y { p } else { 1.0 - p };
            -q.max(f64::MIN_POSITIVE).ln()
        })
        .sum();
    total / probabilities.len() as f64
}

/// Fraction of samples on the right side of 0.5
pub fn accuracy(probabilities: &[f64], labels: &[bool]) -> f64 {
    if probabilities.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(&p, &y)| (p >= 0.5) == y)
        .count();
    correct as f64 / probabilities.len() as f64
}

/// Metrics of a model on labelled data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub n_samples: usize,
    pub n_positive: usize,
    /// Total negative log-likelihood
    pub loss: f64,
    pub mean_loss: f64,
    pub auc: f64,
    pub accuracy: f64,
}

impl EvaluationMetrics {
    /// Evaluate `model` on samples encoded with its encoder.
    pub fn compute(model: &Ensemble, data: &[SparseSample]) -> Result<Self, DataError> {
        let labels: Vec<bool> = data
            .iter()
            .enumerate()
            .map(|(i, x)| x.label().ok_or(DataError::MissingLabel(i)))
            .collect::<Result<_, _>>()?;
        let probabilities: Vec<f64> = data.iter().map(|x| model.predict_probability(x)).collect();
        let loss = model.loss(data)?;
        let n = data.len();
        Ok(Self {
            n_samples: n,
            n_positive: labels.iter().filter(|&&y| y).count(),
            loss,
            mean_loss: if n > 0 { loss / n as f64 } else { 0.0 },
            auc: roc_auc(&probabilities, &labels),
            accuracy: accuracy(&probabilities, &labels),
        })
    }
}
