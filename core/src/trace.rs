//! Optimisation trace and regularisation path
//!
//! The trace records one row per estimator iteration; the path records one
//! row per accepted `(λ, θ)` of the outer selection loop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// One estimator iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Seconds since the trace was started
    pub duration: f64,
    pub iteration: usize,
    /// Relative parameter change
    pub change: f64,
    pub nonzero: usize,
    pub lambda: Option<f64>,
    pub loss: Option<f64>,
}

/// Population variance of the `nonzero` column over the last `n` rows of
/// `rows`; NaN if fewer than `n` rows are available.
pub fn comp_var(rows: &[TraceRow], n: usize) -> f64 {
    if n == 0 || rows.len() < n {
        return f64::NAN;
    }
    let tail = &rows[rows.len() - n..];
    let mean = tail.iter().map(|r| r.nonzero as f64).sum::<f64>() / n as f64;
    tail.iter()
        .map(|r| (r.nonzero as f64 - mean).powi(2))
        .sum::<f64>()
        / n as f64
}

/// Recorded estimator iterations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    rows: Vec<TraceRow>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: TraceRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Variance of the last `n` non-zero counts (NaN if fewer rows).
    pub fn comp_var(&self, n: usize) -> f64 {
        comp_var(&self.rows, n)
    }

    /// Append another trace, shifting its durations after ours.
    pub fn extend(&mut self, other: &Trace) {
        let offset = self.rows.last().map(|r| r.duration).unwrap_or(0.0);
        self.rows.extend(other.rows.iter().map(|r| TraceRow {
            duration: r.duration + offset,
            ..r.clone()
        }));
    }

    /// Write as a whitespace-separated table. The `lambda` and `loss`
    /// columns are present only if some row carries them.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        let has_lambda = self.rows.iter().any(|r| r.lambda.is_some());
        let has_loss = self.rows.iter().any(|r| r.loss.is_some());
        write!(w, "duration iteration change nonzero")?;
        if has_lambda {
            write!(w, " lambda")?;
        }
        if has_loss {
            write!(w, " loss")?;
        }
        writeln!(w)?;
        let na = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "NA".to_string());
        for r in &self.rows {
            write!(
                w,
                "{} {} {} {}",
                r.duration, r.iteration, r.change, r.nonzero
            )?;
            if has_lambda {
                write!(w, " {}", na(r.lambda))?;
            }
            if has_loss {
                write!(w, " {}", na(r.loss))?;
            }
            writeln!(w)?;
        }
        w.flush()
    }
}

/// One accepted point of the regularisation path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRow {
    pub estimator: Option<usize>,
    pub lambda: f64,
    pub norm: f64,
    /// Values over the union of keys seen so far
    pub theta: Vec<f64>,
}

/// Records `(λ, θ)` along the outer loop, aligning every row to the union
/// of feature keys seen so far. Earlier rows are zero-padded as the union
/// grows.
#[derive(Debug, Clone)]
pub struct PathRecorder<K: Ord + Clone> {
    keys: BTreeMap<K, ()>,
    entries: Vec<(Option<usize>, f64, f64, BTreeMap<K, f64>)>,
}

impl<K: Ord + Clone> Default for PathRecorder<K> {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Ord + Clone> PathRecorder<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one point; `coefficients` excludes the bias.
    pub fn record(
        &mut self,
        estimator: Option<usize>,
        lambda: f64,
        coefficients: impl IntoIterator<Item = (K, f64)>,
    ) {
        let values: BTreeMap<K, f64> = coefficients.into_iter().collect();
        let norm = values.values().map(|v| v.abs()).sum();
        for k in values.keys() {
            self.keys.insert(k.clone(), ());
        }
        self.entries.push((estimator, lambda, norm, values));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of the union, in column order.
    pub fn keys(&self) -> Vec<K> {
        self.keys.keys().cloned().collect()
    }

    /// Rows aligned to the current union.
    pub fn rows(&self) -> Vec<PathRow> {
        self.entries
            .iter()
            .map(|(estimator, lambda, norm, values)| PathRow {
                estimator: *estimator,
                lambda: *lambda,
                norm: *norm,
                theta: self
                    .keys
                    .keys()
                    .map(|k| values.get(k).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect()
    }

    /// Write as a table with header `[estimator] lambda norm theta`.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        let rows = self.rows();
        let with_estimator = rows.iter().any(|r| r.estimator.is_some());
        if with_estimator {
            write!(w, "estimator ")?;
        }
        writeln!(w, "lambda norm theta")?;
        for r in rows {
            if with_estimator {
                write!(w, "{} ", r.estimator.unwrap_or(0))?;
            }
            let theta: Vec<String> = r.theta.iter().map(|v| v.to_string()).collect();
            writeln!(w, "{} {} {}", r.lambda, r.norm, theta.join(","))?;
        }
        w.flush()
    }
}
