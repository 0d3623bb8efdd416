//! Feature universe and active feature lists
//!
//! A [`FeatureCatalog`] declares the base features (k-mer classes or score
//! columns). A [`FeatureIndices`] list names the active coefficients as
//! pairs `(i, j)` into that universe: `i == j` is a single feature,
//! `i < j` the co-occurrence of two base features.

use crate::combine::IncompatibleError;
use crate::io::DataError;
use crate::kmer::{KmerClass, KmerClassId, KmerConfig, KmerCounter, KmerCounts};
use crate::pair_index::PairIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One active coefficient, serialised as `[i, j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Feature(pub usize, pub usize);

impl Feature {
    pub fn single(i: usize) -> Self {
        Feature(i, i)
    }

    /// Unordered pair, normalised so that the smaller id comes first.
    pub fn pair(i: usize, j: usize) -> Self {
        Feature(i.min(j), i.max(j))
    }

    pub fn is_pair(&self) -> bool {
        self.0 != self.1
    }

    /// Position in the full pair-indexed coefficient space (1-based).
    pub fn full_index(&self, pairs: &PairIndex) -> usize {
        pairs.index(self.0, self.1)
    }

    /// Inverse of [`Feature::full_index`].
    pub fn from_full_index(pairs: &PairIndex, index: usize) -> Self {
        let (i, j) = pairs.pair(index - 1);
        Feature(i, j)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Lexicographically sorted, duplicate-free list of active features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureIndices(Vec<Feature>);

impl FeatureIndices {
    pub fn new(mut features: Vec<Feature>) -> Self {
        for f in features.iter_mut() {
            *f = Feature::pair(f.0, f.1);
        }
        features.sort_unstable();
        features.dedup();
        Self(features)
    }

    /// All single features `(0,0) .. (n-1,n-1)`.
    pub fn diagonal(n: usize) -> Self {
        Self((0..n).map(Feature::single).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Feature] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.0.iter()
    }

    /// Coefficient position (1-based, 0 is the bias) of a feature.
    pub fn position(&self, feature: Feature) -> Option<usize> {
        self.0.binary_search(&feature).ok().map(|p| p + 1)
    }

    pub fn contains_pairs(&self) -> bool {
        self.0.iter().any(Feature::is_pair)
    }

    /// Largest base feature id referenced, if any.
    pub fn max_id(&self) -> Option<usize> {
        self.0.iter().map(|f| f.1).max()
    }

    /// Check the list is strictly increasing with `i <= j` in every pair,
    /// as a deserialised list is taken as is.
    pub fn check_order(&self) -> Result<(), DataError> {
        if let Some(f) = self.0.iter().find(|f| f.0 > f.1) {
            return Err(DataError::InvalidFormat(format!("feature {} is not an ordered pair", f)));
        }
        if let Some(w) = self.0.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DataError::InvalidFormat(format!(
                "features must be sorted without duplicates, found {} before {}",
                w[0], w[1]
            )));
        }
        Ok(())
    }

    /// Check all ids are below `n`.
    pub fn check_range(&self, n: usize) -> Result<(), DataError> {
        match self.max_id() {
            Some(id) if id >= n => Err(DataError::FeatureOutOfRange { id, n }),
            _ => Ok(()),
        }
    }

    /// Rewrite base ids through `mapping` (old id -> new id). The mapping
    /// must be monotone so that the list stays sorted.
    pub fn remap(&self, mapping: &[Option<usize>]) -> Self {
        Self(
            self.0
                .iter()
                .filter_map(|f| Some(Feature(mapping[f.0]?, mapping[f.1]?)))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a FeatureIndices {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Identity of a base feature independent of its position in a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseKey {
    Kmer(KmerClassId),
    Column(usize),
}

/// Identity of an active coefficient: an unordered pair of base keys.
pub type FeatureKey = (BaseKey, BaseKey);

/// Declared base features of a model or training run.
#[derive(Debug, Clone)]
pub enum FeatureCatalog {
    /// K-mer classes sorted by id
    Kmers {
        config: KmerConfig,
        classes: Vec<KmerClass>,
    },
    /// Score-table columns
    Scores { n_columns: usize },
}

impl FeatureCatalog {
    /// Catalog of all classes occurring in `counts`.
    pub fn from_kmer_counts(counter: &KmerCounter, counts: &[KmerCounts]) -> Self {
        let mut ids: Vec<KmerClassId> = counts.iter().flat_map(|c| c.keys().copied()).collect();
        ids.sort_unstable();
        ids.dedup();
        Self::Kmers {
            config: counter.config().clone(),
            classes: ids.into_iter().map(|id| counter.class(id)).collect(),
        }
    }

    /// Catalog from explicit k-mer classes (sorted and deduplicated).
    pub fn from_kmer_classes(config: KmerConfig, mut classes: Vec<KmerClass>) -> Self {
        classes.sort();
        classes.dedup();
        Self::Kmers { config, classes }
    }

    /// Number of base features.
    pub fn len(&self) -> usize {
        match self {
            Self::Kmers { classes, .. } => classes.len(),
            Self::Scores { n_columns } => *n_columns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_kmer(&self) -> bool {
        matches!(self, Self::Kmers { .. })
    }

    pub fn kmer_config(&self) -> Option<&KmerConfig> {
        match self {
            Self::Kmers { config, .. } => Some(config),
            Self::Scores { .. } => None,
        }
    }

    pub fn key(&self, i: usize) -> BaseKey {
        match self {
            Self::Kmers { classes, .. } => BaseKey::Kmer(classes[i].id),
            Self::Scores { .. } => BaseKey::Column(i),
        }
    }

    pub fn feature_key(&self, feature: Feature) -> FeatureKey {
        (self.key(feature.0), self.key(feature.1))
    }

    pub fn index_of(&self, key: &BaseKey) -> Option<usize> {
        match (self, key) {
            (Self::Kmers { classes, .. }, BaseKey::Kmer(id)) => {
                classes.binary_search_by_key(id, |c| c.id).ok()
            }
            (Self::Scores { n_columns }, BaseKey::Column(c)) if c < n_columns => Some(*c),
            _ => None,
        }
    }

    /// Human readable name of a base feature.
    pub fn name(&self, i: usize) -> String {
        match self {
            Self::Kmers { classes, .. } => classes[i].to_string(),
            Self::Scores { .. } => format!("x{}", i),
        }
    }

    /// Name of an active feature, pairs joined with `:`.
    pub fn feature_name(&self, feature: Feature) -> String {
        if feature.is_pair() {
            format!("{}:{}", self.name(feature.0), self.name(feature.1))
        } else {
            self.name(feature.0)
        }
    }

    /// Map a sequence's class counts onto catalog ids, sorted by id.
    /// Classes unknown to the catalog are dropped.
    pub fn counts_from_kmers(&self, counts: &KmerCounts) -> Vec<(usize, f64)> {
        let mut out: Vec<(usize, f64)> = counts
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .filter_map(|(id, v)| self.index_of(&BaseKey::Kmer(*id)).map(|i| (i, *v)))
            .collect();
        out.sort_unstable_by_key(|&(i, _)| i);
        out
    }

    /// Keep only the base features referenced by `features`.
    ///
    /// Returns the restricted catalog and the remapped feature list. Score
    /// catalogs keep their column numbering.
    pub fn restrict(&self, features: &FeatureIndices) -> (Self, FeatureIndices) {
        match self {
            Self::Kmers { config, classes } => {
                let mut used = vec![false; classes.len()];
                for f in features {
                    used[f.0] = true;
                    used[f.1] = true;
                }
                let mut mapping = vec![None; classes.len()];
                let mut kept = Vec::new();
                for (i, class) in classes.iter().enumerate() {
                    if used[i] {
                        mapping[i] = Some(kept.len());
                        kept.push(class.clone());
                    }
                }
                (
                    Self::Kmers {
                        config: config.clone(),
                        classes: kept,
                    },
                    features.remap(&mapping),
                )
            }
            Self::Scores { .. } => (self.clone(), features.clone()),
        }
    }

    /// Catalog holding exactly `keys` (k-mer catalogs) or enough columns to
    /// cover them (score catalogs).
    pub fn with_keys(&self, keys: &[BaseKey]) -> Result<Self, IncompatibleError> {
        match self {
            Self::Kmers { config, .. } => {
                let counter = KmerCounter::new(config.clone())
                    .map_err(|e| IncompatibleError::Configuration(e.to_string()))?;
                let classes = keys
                    .iter()
                    .map(|k| match k {
                        BaseKey::Kmer(id) => Ok(counter.class(*id)),
                        BaseKey::Column(_) => Err(IncompatibleError::ModelType),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::from_kmer_classes(config.clone(), classes))
            }
            Self::Scores { n_columns } => {
                let mut n = *n_columns;
                for k in keys {
                    match k {
                        BaseKey::Column(c) => n = n.max(c + 1),
                        BaseKey::Kmer(_) => return Err(IncompatibleError::ModelType),
                    }
                }
                Ok(Self::Scores { n_columns: n })
            }
        }
    }

    /// Reject catalogs built from different universes.
    pub fn check_compatible(&self, other: &Self) -> Result<(), IncompatibleError> {
        match (self, other) {
            (Self::Kmers { config: a, .. }, Self::Kmers { config: b, .. }) => {
                if a.same_universe(b) {
                    Ok(())
                } else {
                    Err(IncompatibleError::Alphabet(format!(
                        "{} [{}, {}] vs {} [{}, {}]",
                        a.alphabet, a.m, a.n, b.alphabet, b.m, b.n
                    )))
                }
            }
            (Self::Scores { .. }, Self::Scores { .. }) => Ok(()),
            _ => Err(IncompatibleError::ModelType),
        }
    }
}
