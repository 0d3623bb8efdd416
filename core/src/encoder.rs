//! Sparse encoding of per-sample counts over an active feature list

use crate::features::FeatureIndices;
use crate::io::DataError;
use crate::sparse::SparseSample;

/// Turns base-feature counts into [`SparseSample`]s.
///
/// With an active list `F`, coefficient `p` (1-based) of the output holds
/// `c[i]` for a single feature `(i,i)` and `c[i]·c[j]` for a pair `(i,j)`.
/// In generating mode every non-zero count is emitted at `id + 1`.
#[derive(Debug, Clone)]
pub struct CountEncoder {
    features: FeatureIndices,
    n_base: usize,
    generate: bool,
    /// `(i, first, end)` ranges of `F` sharing the same first id
    rows: Vec<(usize, usize, usize)>,
}

impl CountEncoder {
    /// Encoder over an explicit active feature list.
    pub fn new(features: FeatureIndices, n_base: usize) -> Result<Self, DataError> {
        features.check_range(n_base)?;
        let mut rows: Vec<(usize, usize, usize)> = Vec::new();
        for (p, f) in features.iter().enumerate() {
            match rows.last_mut() {
                Some(row) if row.0 == f.0 => row.2 = p + 1,
                _ => rows.push((f.0, p, p + 1)),
            }
        }
        Ok(Self {
            features,
            n_base,
            generate: false,
            rows,
        })
    }

    /// Encoder emitting all base features directly.
    pub fn generating(n_base: usize) -> Self {
        Self {
            features: FeatureIndices::default(),
            n_base,
            generate: true,
            rows: Vec::new(),
        }
    }

    pub fn features(&self) -> &FeatureIndices {
        &self.features
    }

    /// Number of feature slots in the output (excluding bias and label).
    pub fn n_features(&self) -> usize {
        if self.generate {
            self.n_base
        } else {
            self.features.len()
        }
    }

    /// Encode counts given as `(feature_id, value)` sorted by id.
    pub fn encode(
        &self,
        counts: &[(usize, f64)],
        label: Option<bool>,
    ) -> Result<SparseSample, DataError> {
        for pair in counts.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(DataError::InvalidFormat(
                    "counts must be sorted by feature id".to_string(),
                ));
            }
        }
        if let Some(&(id, _)) = counts.last() {
            if id >= self.n_base {
                return Err(DataError::FeatureOutOfRange { id, n: self.n_base });
            }
        }

        if self.generate {
            let entries = counts.iter().map(|&(id, v)| (id + 1, v));
            return Ok(SparseSample::new(entries, self.n_base, label));
        }

        let lookup = |j: usize| -> f64 {
            counts
                .binary_search_by_key(&j, |&(id, _)| id)
                .map(|k| counts[k].1)
                .unwrap_or(0.0)
        };
        let features = self.features.as_slice();
        let mut entries = Vec::new();
        let mut row = 0;
        for &(i, ci) in counts {
            if ci == 0.0 {
                continue;
            }
            while row < self.rows.len() && self.rows[row].0 < i {
                row += 1;
            }
            if row == self.rows.len() {
                break;
            }
            let (first, start, end) = self.rows[row];
            if first != i {
                continue;
            }
            for (p, f) in features[start..end].iter().enumerate() {
                let value = if f.1 == i { ci } else { ci * lookup(f.1) };
                if value != 0.0 {
                    entries.push((start + p + 1, value));
                }
            }
        }
        Ok(SparseSample::new(entries, features.len(), label))
    }

    /// Encode a dense row (score tables).
    pub fn encode_dense(&self, row: &[f64], label: Option<bool>) -> Result<SparseSample, DataError> {
        if row.len() < self.n_base {
            return Err(DataError::DimensionMismatch {
                expected: self.n_base,
                got: row.len(),
            });
        }
        let counts: Vec<(usize, f64)> = row[..self.n_base]
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i, *v))
            .collect();
        self.encode(&counts, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BaseKey, Feature, FeatureCatalog};
    use crate::kmer::{Alphabet, KmerConfig, KmerCounter};

    fn counts() -> Vec<(usize, f64)> {
        vec![(0, 2.0), (2, 3.0), (3, 5.0)]
    }

    #[test]
    fn test_diagonal_matches_raw_counts() {
        let enc = CountEncoder::new(FeatureIndices::diagonal(4), 4).unwrap();
        let x = enc.encode(&counts(), Some(true)).unwrap();
        assert_eq!(x.indices(), &[0, 1, 3, 4, 5]);
        assert_eq!(x.values(), &[1.0, 2.0, 3.0, 5.0, 1.0]);
        assert_eq!(x.value(2), 0.0);
        assert_eq!(x.label(), Some(true));
        assert_eq!(x.dim(), 6);
    }

    #[test]
    fn test_pairs_are_products() {
        let features = FeatureIndices::new(vec![
            Feature(0, 0),
            Feature(0, 1),
            Feature(0, 2),
            Feature(2, 3),
            Feature(3, 3),
        ]);
        let enc = CountEncoder::new(features, 4).unwrap();
        let x = enc.encode(&counts(), None).unwrap();
        // (0,1) is zero because feature 1 is absent
        assert_eq!(x.features().collect::<Vec<_>>(), vec![(1, 2.0), (3, 6.0), (4, 15.0), (5, 5.0)]);
        assert_eq!(x.label(), None);
    }

    #[test]
    fn test_generating_mode() {
        let enc = CountEncoder::generating(4);
        let x = enc.encode(&counts(), Some(false)).unwrap();
        assert_eq!(x.features().collect::<Vec<_>>(), vec![(1, 2.0), (3, 3.0), (4, 5.0)]);
        assert_eq!(x.label(), Some(false));
        assert_eq!(x.counts(), counts());
    }

    #[test]
    fn test_empty_feature_list_yields_bias_only() {
        let enc = CountEncoder::new(FeatureIndices::default(), 4).unwrap();
        let x = enc.encode(&counts(), None).unwrap();
        assert_eq!(x.nnz(), 0);
        assert_eq!(x.dim(), 1);
    }

    #[test]
    fn test_out_of_range() {
        assert!(CountEncoder::new(FeatureIndices::new(vec![Feature(0, 4)]), 4).is_err());
        let enc = CountEncoder::generating(3);
        assert!(matches!(
            enc.encode(&counts(), None),
            Err(DataError::FeatureOutOfRange { id: 3, n: 3 })
        ));
    }

    #[test]
    fn test_no_zero_values_stored() {
        let enc = CountEncoder::new(FeatureIndices::diagonal(4), 4).unwrap();
        let x = enc.encode(&[(0, 0.0), (1, 1.0)], None).unwrap();
        assert!(x.features().all(|(_, v)| v != 0.0));
    }

    #[test]
    fn test_dense_rows() {
        let enc = CountEncoder::new(FeatureIndices::new(vec![Feature(1, 1), Feature(1, 2)]), 3).unwrap();
        let x = enc.encode_dense(&[9.0, 2.0, 4.0], None).unwrap();
        assert_eq!(x.features().collect::<Vec<_>>(), vec![(1, 2.0), (2, 8.0)]);
        assert!(enc.encode_dense(&[1.0], None).is_err());
    }

    fn kmer_counter() -> KmerCounter {
        KmerCounter::new(KmerConfig::new(Alphabet::GappedNucleotide, 2, 4).with_revcomp(true)).unwrap()
    }

    const SEQUENCES: [&[u8]; 2] = [b"acgtacggttacgaatcg", b"ttgcaacgtgcatgcaac"];

    #[test]
    fn test_kmer_diagonal_and_pairs_follow_counts() {
        let counter = kmer_counter();
        let counts: Vec<_> = SEQUENCES.iter().map(|s| counter.count(s)).collect();
        let catalog = FeatureCatalog::from_kmer_counts(&counter, &counts);
        let n = catalog.len();
        assert!(n > 3);

        let pairs = [Feature::pair(0, 1), Feature::pair(1, n - 1), Feature::pair(2, 3)];
        let features = FeatureIndices::new(
            FeatureIndices::diagonal(n)
                .iter()
                .copied()
                .chain(pairs)
                .collect(),
        );
        let enc = CountEncoder::new(features.clone(), n).unwrap();

        for c in &counts {
            let x = enc.encode(&catalog.counts_from_kmers(c), None).unwrap();
            let count = |i: usize| match catalog.key(i) {
                BaseKey::Kmer(id) => c.get(&id).copied().unwrap_or(0.0),
                BaseKey::Column(_) => unreachable!(),
            };
            for i in 0..n {
                let p = features.position(Feature::single(i)).unwrap();
                assert_eq!(x.value(p), count(i), "{}", catalog.name(i));
            }
            for f in pairs {
                let p = features.position(f).unwrap();
                assert_eq!(x.value(p), count(f.0) * count(f.1), "{}", catalog.feature_name(f));
            }
            assert!(x.values().iter().all(|v| *v != 0.0));
        }
    }

    #[test]
    fn test_kmer_encoding_independent_of_catalog_origin() {
        let counter = kmer_counter();
        let counts: Vec<_> = SEQUENCES.iter().map(|s| counter.count(s)).collect();
        let discovered = FeatureCatalog::from_kmer_counts(&counter, &counts);
        let names: Vec<String> = (0..discovered.len()).map(|i| discovered.name(i)).collect();
        let given = FeatureCatalog::from_kmer_classes(
            counter.config().clone(),
            names.iter().rev().map(|s| counter.parse_class(s).unwrap()).collect(),
        );
        assert_eq!(given.len(), discovered.len());

        let n = discovered.len();
        let features = FeatureIndices::new(
            FeatureIndices::diagonal(n)
                .iter()
                .copied()
                .chain([Feature::pair(0, n - 1)])
                .collect(),
        );
        let enc = CountEncoder::new(features, n).unwrap();
        for c in &counts {
            assert_eq!(
                enc.encode(&discovered.counts_from_kmers(c), Some(true)).unwrap(),
                enc.encode(&given.counts_from_kmers(c), Some(true)).unwrap()
            );
        }
    }
}
