//! K-mer equivalence classes and sequence counting

use super::Alphabet;
use crate::io::DataError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

const INVALID: u8 = u8::MAX;

/// Settings that define the k-mer feature universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerConfig {
    pub alphabet: Alphabet,
    /// Minimum k-mer length
    pub m: usize,
    /// Maximum k-mer length
    pub n: usize,
    pub complement: bool,
    pub reverse: bool,
    pub revcomp: bool,
    /// Ambiguous positions allowed per length (`-1` = unlimited). Either
    /// empty, a single value for all lengths, or one value per length.
    pub max_ambiguous: Vec<i64>,
    pub binarize: bool,
    pub cooccurrence: bool,
}

impl KmerConfig {
    pub fn new(alphabet: Alphabet, m: usize, n: usize) -> Self {
        Self {
            alphabet,
            m,
            n,
            complement: false,
            reverse: false,
            revcomp: false,
            max_ambiguous: Vec::new(),
            binarize: false,
            cooccurrence: false,
        }
    }

    pub fn with_revcomp(mut self, revcomp: bool) -> Self {
        self.revcomp = revcomp;
        self
    }

    pub fn with_binarize(mut self, binarize: bool) -> Self {
        self.binarize = binarize;
        self
    }

    pub fn with_max_ambiguous(mut self, max_ambiguous: Vec<i64>) -> Self {
        self.max_ambiguous = max_ambiguous;
        self
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.m == 0 || self.m > self.n {
            return Err(DataError::InvalidFormat(format!(
                "invalid k-mer range [{}, {}]",
                self.m, self.n
            )));
        }
        if (self.alphabet.size() as u64)
            .checked_pow(self.n as u32)
            .is_none()
        {
            return Err(DataError::InvalidFormat(format!(
                "k-mer length {} too large for alphabet {}",
                self.n, self.alphabet
            )));
        }
        let lengths = self.n - self.m + 1;
        if self.max_ambiguous.len() > 1 && self.max_ambiguous.len() != lengths {
            return Err(DataError::InvalidFormat(format!(
                "max-ambiguous must have 1 or {} entries, got {}",
                lengths,
                self.max_ambiguous.len()
            )));
        }
        Ok(())
    }

    /// Ambiguity budget for length `k`; `None` means unlimited.
    pub fn max_ambiguous_for(&self, k: usize) -> Option<usize> {
        let value = match self.max_ambiguous.len() {
            0 => return None,
            1 => self.max_ambiguous[0],
            _ => self.max_ambiguous[k - self.m],
        };
        usize::try_from(value).ok()
    }

    /// Whether two configurations count the same universe of classes.
    pub fn same_universe(&self, other: &Self) -> bool {
        self.alphabet == other.alphabet
            && self.m == other.m
            && self.n == other.n
            && self.complement == other.complement
            && self.reverse == other.reverse
            && self.revcomp == other.revcomp
            && self.max_ambiguous == other.max_ambiguous
            && self.binarize == other.binarize
    }
}

/// Identity of a k-mer equivalence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KmerClassId {
    pub k: usize,
    /// Rank of the canonical member in base-|alphabet| order
    pub code: u64,
}

/// A k-mer class with its distinct member spellings (canonical first).
#[derive(Debug, Clone)]
pub struct KmerClass {
    pub id: KmerClassId,
    pub elements: Vec<String>,
}

impl PartialEq for KmerClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for KmerClass {}

impl PartialOrd for KmerClass {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KmerClass {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for KmerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.join("|"))
    }
}

/// Per-sequence class counts.
pub type KmerCounts = HashMap<KmerClassId, f64>;

/// Counts k-mer classes in sequences according to a [`KmerConfig`].
#[derive(Debug, Clone)]
pub struct KmerCounter {
    config: KmerConfig,
}

impl KmerCounter {
    pub fn new(config: KmerConfig) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KmerConfig {
        &self.config
    }

    fn encode(&self, pattern: &[u8]) -> u64 {
        let b = self.config.alphabet.size() as u64;
        pattern.iter().fold(0, |acc, &c| acc * b + c as u64)
    }

    /// Code of the canonical member among the enabled equivalents.
    fn canonical_code(&self, pattern: &[u8]) -> u64 {
        let alphabet = self.config.alphabet;
        let b = alphabet.size() as u64;
        let mut best = self.encode(pattern);
        if self.config.complement {
            let c = pattern
                .iter()
                .fold(0, |acc, &c| acc * b + alphabet.complement(c) as u64);
            best = best.min(c);
        }
        if self.config.reverse {
            let c = pattern.iter().rev().fold(0, |acc, &c| acc * b + c as u64);
            best = best.min(c);
        }
        if self.config.revcomp {
            let c = pattern
                .iter()
                .rev()
                .fold(0, |acc, &c| acc * b + alphabet.complement(c) as u64);
            best = best.min(c);
        }
        best
    }

    fn decode(&self, id: KmerClassId) -> Vec<u8> {
        let b = self.config.alphabet.size() as u64;
        let mut pattern = vec![0u8; id.k];
        let mut code = id.code;
        for slot in pattern.iter_mut().rev() {
            *slot = (code % b) as u8;
            code /= b;
        }
        pattern
    }

    fn spell(&self, pattern: &[u8]) -> String {
        pattern
            .iter()
            .map(|&c| self.config.alphabet.letter(c) as char)
            .collect()
    }

    /// Materialise a class with its member spellings.
    pub fn class(&self, id: KmerClassId) -> KmerClass {
        let alphabet = self.config.alphabet;
        let pattern = self.decode(id);
        let mut variants = vec![pattern.clone()];
        if self.config.complement {
            variants.push(pattern.iter().map(|&c| alphabet.complement(c)).collect());
        }
        if self.config.reverse {
            variants.push(pattern.iter().rev().copied().collect());
        }
        if self.config.revcomp {
            variants.push(
                pattern
                    .iter()
                    .rev()
                    .map(|&c| alphabet.complement(c))
                    .collect(),
            );
        }
        variants.sort_by_key(|v| self.encode(v));
        variants.dedup();
        KmerClass {
            id,
            elements: variants.iter().map(|v| self.spell(v)).collect(),
        }
    }

    /// Parse the textual form of a class (`acgt|acgt...`, first member used).
    pub fn parse_class(&self, s: &str) -> Result<KmerClass, DataError> {
        let first = s.split('|').next().unwrap_or("").trim();
        let pattern = first
            .bytes()
            .map(|l| {
                self.config.alphabet.code(l).ok_or_else(|| {
                    DataError::InvalidFormat(format!("invalid letter in k-mer `{}`", s))
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        let k = pattern.len();
        if k < self.config.m || k > self.config.n {
            return Err(DataError::InvalidFormat(format!(
                "k-mer `{}` outside length range [{}, {}]",
                s, self.config.m, self.config.n
            )));
        }
        Ok(self.class(KmerClassId {
            k,
            code: self.canonical_code(&pattern),
        }))
    }

    /// Push the canonical codes of `pattern` and all of its interior
    /// generalisations within `budget` ambiguous positions.
    fn generalise(&self, pattern: &mut [u8], pos: usize, budget: usize, out: &mut Vec<u64>) {
        if pos + 1 >= pattern.len() {
            out.push(self.canonical_code(pattern));
            return;
        }
        self.generalise(pattern, pos + 1, budget, out);
        if budget == 0 {
            return;
        }
        let alphabet = self.config.alphabet;
        let base = pattern[pos];
        for c in alphabet.ambiguous_covers(base) {
            pattern[pos] = c;
            self.generalise(pattern, pos + 1, budget - 1, out);
        }
        pattern[pos] = base;
    }

    /// Count all classes occurring in `sequence`.
    pub fn count(&self, sequence: &[u8]) -> KmerCounts {
        let codes: Vec<u8> = sequence
            .iter()
            .map(|&l| match l.to_ascii_lowercase() {
                b'a' => 0,
                b'c' => 1,
                b'g' => 2,
                b't' => 3,
                _ => INVALID,
            })
            .collect();
        // run[i]: number of consecutive valid letters starting at i
        let mut run = vec![0usize; codes.len() + 1];
        for i in (0..codes.len()).rev() {
            run[i] = if codes[i] == INVALID { 0 } else { run[i + 1] + 1 };
        }

        let mut counts = KmerCounts::new();
        let mut scratch = Vec::new();
        let mut pattern = Vec::with_capacity(self.config.n);
        for k in self.config.m..=self.config.n {
            if codes.len() < k {
                continue;
            }
            let budget = self.config.max_ambiguous_for(k).unwrap_or(usize::MAX);
            for start in 0..=codes.len() - k {
                if run[start] < k {
                    continue;
                }
                pattern.clear();
                pattern.extend_from_slice(&codes[start..start + k]);
                scratch.clear();
                self.generalise(&mut pattern, 1, budget, &mut scratch);
                scratch.sort_unstable();
                scratch.dedup();
                for &code in &scratch {
                    *counts.entry(KmerClassId { k, code }).or_insert(0.0) += 1.0;
                }
            }
        }
        if self.config.binarize {
            counts.values_mut().for_each(|v| *v = 1.0);
        }
        counts
    }
}
