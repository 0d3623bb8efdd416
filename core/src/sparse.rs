//! Sparse sample vectors
//!
//! A sample is stored as strictly increasing `(index, value)` pairs. Slot 0
//! always holds the bias entry `1.0`; feature `p` (1-based) sits at index
//! `p`. Training samples additionally embed their class label in the last
//! slot (`dim - 1`), stored even when the label is `0`.

/// In-memory sparse vector with a leading bias slot and optional trailing
/// label slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseSample {
    indices: Vec<usize>,
    values: Vec<f64>,
    dim: usize,
    labelled: bool,
}

impl SparseSample {
    /// Build a sample from feature entries.
    ///
    /// `entries` are 1-based feature positions in `1..=n_features` with
    /// strictly increasing positions. Exact zeros are dropped.
    ///
    /// # Panics
    /// Panics if positions are out of range or not strictly increasing.
    pub fn new<I>(entries: I, n_features: usize, label: Option<bool>) -> Self
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut indices = vec![0];
        let mut values = vec![1.0];
        for (position, value) in entries {
            assert!(
                position >= 1 && position <= n_features,
                "feature position {} outside 1..={}",
                position,
                n_features
            );
            assert!(
                *indices.last().unwrap_or(&0) < position,
                "sample indices must be strictly increasing"
            );
            if value != 0.0 {
                indices.push(position);
                values.push(value);
            }
        }
        let mut dim = n_features + 1;
        if let Some(y) = label {
            indices.push(dim);
            values.push(if y { 1.0 } else { 0.0 });
            dim += 1;
        }
        Self {
            indices,
            values,
            dim,
            labelled: label.is_some(),
        }
    }

    /// Total dimension including bias and label slots.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of feature slots (excluding bias and label).
    pub fn n_features(&self) -> usize {
        self.dim - 1 - usize::from(self.labelled)
    }

    /// Raw stored indices (bias, features and label).
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Raw stored values (bias, features and label).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Class label, if embedded.
    pub fn label(&self) -> Option<bool> {
        if !self.labelled {
            return None;
        }
        let last = self.indices.len() - 1;
        assert_eq!(
            self.indices[last],
            self.dim - 1,
            "label must occupy the last slot"
        );
        Some(self.values[last] != 0.0)
    }

    /// Feature indices and values, without bias and label slots.
    pub fn feature_slices(&self) -> (&[usize], &[f64]) {
        let end = self.indices.len() - usize::from(self.labelled);
        (&self.indices[1..end], &self.values[1..end])
    }

    /// Iterate over `(position, value)` of stored features.
    pub fn features(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (indices, values) = self.feature_slices();
        indices.iter().copied().zip(values.iter().copied())
    }

    /// Number of stored feature entries.
    pub fn nnz(&self) -> usize {
        self.feature_slices().0.len()
    }

    /// Value at a feature position (0 if absent).
    pub fn value(&self, position: usize) -> f64 {
        let (indices, values) = self.feature_slices();
        match indices.binary_search(&position) {
            Ok(k) => values[k],
            Err(_) => 0.0,
        }
    }

    /// Base-feature counts `(feature_id, value)` with 0-based ids.
    pub fn counts(&self) -> Vec<(usize, f64)> {
        self.features().map(|(p, v)| (p - 1, v)).collect()
    }

    /// Squared Euclidean norm over the feature entries.
    pub fn squared_norm(&self) -> f64 {
        self.feature_slices().1.iter().map(|v| v * v).sum()
    }

    /// Copy of this sample with the label replaced (or added).
    pub fn with_label(&self, label: Option<bool>) -> Self {
        Self::new(self.features(), self.n_features(), label)
    }
}

/// Labels of a training set. Returns `None` if any sample is unlabelled.
pub fn labels(data: &[SparseSample]) -> Option<Vec<bool>> {
    data.iter().map(|x| x.label()).collect()
}

/// Gather samples by index.
pub fn subset(data: &[SparseSample], indices: &[usize]) -> Vec<SparseSample> {
    indices.iter().map(|&i| data[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_and_label_slots() {
        let x = SparseSample::new(vec![(1, 2.0), (3, 5.0)], 4, Some(false));
        assert_eq!(x.dim(), 6);
        assert_eq!(x.n_features(), 4);
        assert_eq!(x.indices(), &[0, 1, 3, 5]);
        assert_eq!(x.values(), &[1.0, 2.0, 5.0, 0.0]);
        assert_eq!(x.label(), Some(false));
        assert_eq!(x.nnz(), 2);
    }

    #[test]
    fn test_zero_entries_dropped() {
        let x = SparseSample::new(vec![(1, 0.0), (2, 1.5)], 2, None);
        assert_eq!(x.indices(), &[0, 2]);
        assert_eq!(x.label(), None);
        assert_eq!(x.value(1), 0.0);
        assert_eq!(x.value(2), 1.5);
    }

    #[test]
    fn test_counts_are_zero_based() {
        let x = SparseSample::new(vec![(1, 2.0), (4, 1.0)], 4, Some(true));
        assert_eq!(x.counts(), vec![(0, 2.0), (3, 1.0)]);
        assert!((x.squared_norm() - 5.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_unsorted_entries_panic() {
        SparseSample::new(vec![(2, 1.0), (1, 1.0)], 3, None);
    }

    #[test]
    fn test_relabel() {
        let x = SparseSample::new(vec![(2, 3.0)], 3, Some(true));
        let y = x.with_label(None);
        assert_eq!(y.dim(), 4);
        assert_eq!(y.features().collect::<Vec<_>>(), vec![(2, 3.0)]);
        assert_eq!(labels(&[x.clone(), x]), Some(vec![true, true]));
        assert_eq!(labels(&[y]), None);
    }
}
