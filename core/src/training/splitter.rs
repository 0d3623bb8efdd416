//! Stratified data splitting
//!
//! Provides deterministic K-way fold assignment and train/validation splits
//! that keep the class ratio of every part close to the ratio of the whole.

use rand::prelude::*;

/// Split data containing train and validation sets
#[derive(Debug, Clone)]
pub struct SplitData<T: Clone> {
    /// Training data
    pub train: Vec<T>,
    /// Validation data
    pub validation: Vec<T>,
}

impl<T: Clone> SplitData<T> {
    /// Get number of training samples
    pub fn train_size(&self) -> usize {
        self.train.len()
    }

    /// Get number of validation samples
    pub fn validation_size(&self) -> usize {
        self.validation.len()
    }
}

/// Data splitter for folds and validation splits
#[derive(Debug, Clone)]
pub struct DataSplitter {
    /// Fraction of data for validation
    validation_fraction: f64,
    /// Random seed for reproducibility
    seed: u64,
}

impl DataSplitter {
    /// Create a new DataSplitter without a validation part
    pub fn new() -> Self {
        Self {
            validation_fraction: 0.0,
            seed: 42,
        }
    }

    /// Set validation fraction (0.0 - 1.0)
    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Positive and negative sample indices, each shuffled.
    fn shuffled_classes(&self, labels: &[bool]) -> [Vec<usize>; 2] {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, &y) in labels.iter().enumerate() {
            classes[usize::from(y)].push(i);
        }
        for class in classes.iter_mut() {
            class.shuffle(&mut rng);
        }
        classes
    }

    /// Fold number of every sample for a `k`-way stratified partition.
    ///
    /// Each class is dealt round-robin, the second class continuing where
    /// the first stopped, so fold sizes differ by at most one.
    pub fn assign_folds(&self, labels: &[bool], k: usize) -> Vec<usize> {
        assert!(k > 0, "at least one fold required");
        let mut folds = vec![0; labels.len()];
        let mut next = 0;
        for class in self.shuffled_classes(labels) {
            for i in class {
                folds[i] = next % k;
                next += 1;
            }
        }
        folds
    }

    /// Sorted sample indices of every fold.
    pub fn fold_indices(&self, labels: &[bool], k: usize) -> Vec<Vec<usize>> {
        let mut result = vec![Vec::new(); k];
        for (i, fold) in self.assign_folds(labels, k).into_iter().enumerate() {
            result[fold].push(i);
        }
        result
    }

    /// Stratified train/validation split of sample indices.
    pub fn split_indices(&self, labels: &[bool]) -> SplitData<usize> {
        let mut split = SplitData {
            train: Vec::new(),
            validation: Vec::new(),
        };
        if self.validation_fraction <= 0.0 {
            split.train = (0..labels.len()).collect();
            return split;
        }
        for class in self.shuffled_classes(labels) {
            let n = class.len();
            if n == 0 {
                continue;
            }
            // keep at least one sample of each class for training
            let val_size = ((n as f64 * self.validation_fraction).round() as usize).min(n - 1);
            split.validation.extend_from_slice(&class[..val_size]);
            split.train.extend_from_slice(&class[val_size..]);
        }
        split.train.sort_unstable();
        split.validation.sort_unstable();
        split
    }

    /// Stratified train/validation split of `data`.
    pub fn split<T: Clone>(&self, data: &[T], labels: &[bool]) -> SplitData<T> {
        debug_assert_eq!(data.len(), labels.len());
        let indices = self.split_indices(labels);
        SplitData {
            train: indices.train.iter().map(|&i| data[i].clone()).collect(),
            validation: indices.validation.iter().map(|&i| data[i].clone()).collect(),
        }
    }
}

impl Default for DataSplitter {
    fn default() -> Self {
        Self::new()
    }
}
