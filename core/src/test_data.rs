//! Synthetic fixtures for unit tests
//!
//! Every generator is seeded so that tests are reproducible.

use crate::sparse::SparseSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal draw (Box-Muller).
pub(crate) fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Labelled samples over `n_features` base features (position `id + 1`).
///
/// Labels alternate. Feature 0 is always present and shifted by the label
/// (noisy, so the classes overlap); the others are uninformative, present
/// with probability one half.
pub(crate) fn labelled_samples(n: usize, n_features: usize, seed: u64) -> Vec<SparseSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let y = i % 2 == 1;
            let shift = if y { 1.0 } else { -1.0 };
            let mut entries = vec![(1, 2.0 + shift + gaussian(&mut rng))];
            for j in 1..n_features {
                if rng.gen_bool(0.5) {
                    entries.push((j + 1, rng.gen_range(0.1..2.0)));
                }
            }
            SparseSample::new(entries, n_features, Some(y))
        })
        .collect()
}

/// Dense score rows; columns in `informative` are shifted by `shift`.
pub(crate) fn score_rows(
    n: usize,
    n_columns: usize,
    informative: &[usize],
    shift: f64,
    seed: u64,
) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            (0..n_columns)
                .map(|c| {
                    let v = gaussian(&mut rng);
                    if informative.contains(&c) {
                        v + shift
                    } else {
                        v
                    }
                })
                .collect()
        })
        .collect()
}

/// Uniform random `acgt` sequence.
pub(crate) fn random_sequence(rng: &mut StdRng, len: usize) -> Vec<u8> {
    const LETTERS: &[u8] = b"acgt";
    (0..len).map(|_| LETTERS[rng.gen_range(0..4)]).collect()
}

/// Random sequences, each carrying `motif` at a random position.
pub(crate) fn planted_sequences(n: usize, len: usize, motif: &[u8], seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut s = random_sequence(&mut rng, len);
            let at = rng.gen_range(0..=len - motif.len());
            s[at..at + motif.len()].copy_from_slice(motif);
            s
        })
        .collect()
}

/// Random sequences without a planted motif.
pub(crate) fn background_sequences(n: usize, len: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| random_sequence(&mut rng, len)).collect()
}
