//! `count-features` and `expand-scores`

use anyhow::Result;
use kmerlr_core::{KmerClassId, KmerConfig, KmerCounter, KmerCounts, PairIndex};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::data;
use crate::output;

/// Per class: number of sequences containing it and total count.
pub fn class_totals(counts: &[KmerCounts]) -> BTreeMap<KmerClassId, (usize, f64)> {
    let mut totals: BTreeMap<KmerClassId, (usize, f64)> = BTreeMap::new();
    for c in counts {
        for (id, v) in c {
            if *v != 0.0 {
                let entry = totals.entry(*id).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += v;
            }
        }
    }
    totals
}

pub fn count_features(config: KmerConfig, input: &Path, out: Option<&Path>) -> Result<()> {
    let counter = KmerCounter::new(config)?;
    let records = data::read_sequences(input)?;
    let counts = data::count_sequences(&counter, &records, "Counting");
    let totals = class_totals(&counts);

    let mut w = output::writer(out)?;
    writeln!(w, "kmer sequences count")?;
    for (id, (sequences, count)) in &totals {
        writeln!(w, "{} {} {}", counter.class(*id), sequences, count)?;
    }
    w.flush()?;
    output::done(format!("{} classes in {} sequences", totals.len(), records.len()));
    Ok(())
}

/// Row extended by every product `x_i·x_j` with `i < j`, in pair-index order.
pub fn expand_row(row: &[f64]) -> Vec<f64> {
    let pairs = PairIndex::new(row.len());
    let mut out = Vec::with_capacity(pairs.len());
    out.extend_from_slice(row);
    for k in row.len()..pairs.len() {
        let (i, j) = pairs.pair(k);
        out.push(row[i] * row[j]);
    }
    out
}

pub fn expand_scores(input: &Path, out: &Path) -> Result<()> {
    let table = data::read_scores(input)?;
    let mut w = output::writer(Some(out))?;
    for (name, row) in table.names.iter().zip(&table.rows) {
        let values = output::join_values(&expand_row(row));
        match name {
            Some(name) => writeln!(w, "{},{}", name, values)?,
            None => writeln!(w, "{}", values)?,
        }
    }
    w.flush()?;
    output::saved(out);
    Ok(())
}
