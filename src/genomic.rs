//! `predict-genomic`
//!
//! Scores sliding windows over whole sequences or BED3 regions and writes
//! one `fixedStep` wiggle block per sequence or region.

use anyhow::{bail, Result};
use kmerlr_core::io::{read_bed3_file, FastaRecord, Region, WiggleWriter};
use kmerlr_core::{CountEncoder, Ensemble, KmerCounter};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::data;
use crate::output;
use crate::predict::load_kmer_model;

/// Window layout
#[derive(Debug, Clone, Copy)]
pub struct Windows {
    pub size: usize,
    pub step: usize,
}

impl Windows {
    /// Window starts within `[0, len)`. A stretch shorter than one window
    /// is scored as a single window.
    pub fn starts(&self, len: usize) -> Vec<usize> {
        if len == 0 {
            return Vec::new();
        }
        if len <= self.size {
            return vec![0];
        }
        (0..=len - self.size).step_by(self.step).collect()
    }
}

struct Scorer<'a> {
    model: &'a Ensemble,
    counter: KmerCounter,
    encoder: CountEncoder,
}

impl Scorer<'_> {
    fn score(&self, sequence: &[u8]) -> Result<f64> {
        let counts = self.counter.count(sequence);
        let x = self
            .encoder
            .encode(&self.model.catalog().counts_from_kmers(&counts), None)?;
        Ok(self.model.predict_probability(&x))
    }

    /// Scores of every window of `sequence`.
    fn scan(&self, sequence: &[u8], windows: Windows) -> Result<Vec<f64>> {
        windows
            .starts(sequence.len())
            .par_iter()
            .map(|&s| self.score(&sequence[s..(s + windows.size).min(sequence.len())]))
            .collect()
    }
}

/// Sequence name up to the first whitespace.
fn chrom_of(record: &FastaRecord) -> &str {
    record.name.split_whitespace().next().unwrap_or("")
}

pub fn predict_genomic(
    model: &Path,
    genome: &Path,
    out: &Path,
    windows: Windows,
    regions: Option<&Path>,
) -> Result<()> {
    if windows.size == 0 || windows.step == 0 {
        bail!("window and step size must be positive");
    }
    let model = load_kmer_model(model)?;
    let scorer = Scorer {
        counter: data::require_kmer_model(&model)?,
        encoder: model.encoder()?,
        model: &model,
    };
    let records = data::read_sequences(genome)?;

    let regions: Vec<Region> = match regions {
        Some(path) => read_bed3_file(path)?,
        None => records
            .iter()
            .map(|r| Region {
                chrom: chrom_of(r).to_string(),
                start: 0,
                end: r.sequence.len(),
            })
            .collect(),
    };
    let by_name: HashMap<&str, &FastaRecord> =
        records.iter().map(|r| (chrom_of(r), r)).collect();

    let name = model.name();
    let mut wig = WiggleWriter::new(output::writer(Some(out))?, &name)?;
    let pb = output::progress(regions.len(), "Scanning");
    for region in &regions {
        pb.inc(1);
        let record = match by_name.get(region.chrom.as_str()) {
            Some(record) => record,
            None => {
                output::warn(format!("sequence {} not found, skipping", region.chrom));
                continue;
            }
        };
        let end = region.end.min(record.sequence.len());
        if region.start >= end {
            continue;
        }
        let values = scorer.scan(&record.sequence[region.start..end], windows)?;
        let span = windows.size.min(end - region.start);
        wig.write_block(&region.chrom, region.start, windows.step, span, &values)?;
    }
    pb.finish_and_clear();
    wig.finish()?;
    output::saved(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmerlr_core::{
        save_model, Alphabet, FeatureCatalog, FeatureIndices, KmerConfig, StandardTransform,
    };
    use std::fs;

    #[test]
    fn test_window_starts() {
        let w = Windows { size: 4, step: 2 };
        assert_eq!(w.starts(10), vec![0, 2, 4, 6]);
        assert_eq!(w.starts(3), vec![0]);
        assert_eq!(w.starts(4), vec![0]);
        assert!(w.starts(0).is_empty());
    }

    fn aa_model(dir: &Path) -> std::path::PathBuf {
        let config = KmerConfig::new(Alphabet::Nucleotide, 2, 2);
        let counter = KmerCounter::new(config.clone()).unwrap();
        let class = counter.parse_class("aa").unwrap();
        let model = Ensemble::single(
            FeatureCatalog::from_kmer_classes(config, vec![class]),
            FeatureIndices::diagonal(1),
            StandardTransform::identity(),
            vec![-1.0, 1.0],
        )
        .unwrap();
        let path = dir.join("aa.json");
        save_model(&path, &model).unwrap();
        path
    }

    #[test]
    fn test_predict_genomic_whole_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let model = aa_model(dir.path());
        let genome = dir.path().join("g.fa");
        fs::write(&genome, ">chr1\nAAAACCCC\n").unwrap();
        let out = dir.path().join("out.wig");

        predict_genomic(&model, &genome, &out, Windows { size: 4, step: 4 }, None).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("track type=wiggle_0"));
        assert_eq!(lines[1], "fixedStep chrom=chr1 start=1 step=4 span=4");
        // aaaa holds three aa windows, cccc none
        let first: f64 = lines[2].parse().unwrap();
        let second: f64 = lines[3].parse().unwrap();
        assert!((first - 1.0 / (1.0 + (-2f64).exp())).abs() < 1e-12);
        assert!((second - 1.0 / (1.0 + 1f64.exp())).abs() < 1e-12);
    }

    #[test]
    fn test_predict_genomic_regions() {
        let dir = tempfile::tempdir().unwrap();
        let model = aa_model(dir.path());
        let genome = dir.path().join("g.fa");
        fs::write(&genome, ">chr1\nCCCCAAAA\n").unwrap();
        let bed = dir.path().join("r.bed");
        fs::write(&bed, "track name=x\nchr1\t4\t8\nchr9\t0\t4\n").unwrap();
        let out = dir.path().join("out.wig");

        predict_genomic(&model, &genome, &out, Windows { size: 2, step: 2 }, Some(&bed)).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "fixedStep chrom=chr1 start=5 step=2 span=2");
        assert_eq!(lines.len(), 4);
    }
}
