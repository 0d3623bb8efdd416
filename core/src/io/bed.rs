//! BED3 region reader

use super::DataError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Genomic interval, 0-based half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn read_bed3<R: BufRead>(reader: R) -> Result<Vec<Region>, DataError> {
    let mut regions = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(DataError::InvalidFormat(format!(
                "line {}: expected at least 3 BED columns",
                lineno + 1
            )));
        }
        let parse = |s: &str| {
            s.parse::<usize>().map_err(|_| {
                DataError::InvalidFormat(format!("line {}: invalid coordinate `{}`", lineno + 1, s))
            })
        };
        let start = parse(fields[1])?;
        let end = parse(fields[2])?;
        if end < start {
            return Err(DataError::InvalidFormat(format!(
                "line {}: end before start",
                lineno + 1
            )));
        }
        regions.push(Region {
            chrom: fields[0].to_string(),
            start,
            end,
        });
    }
    Ok(regions)
}

pub fn read_bed3_file<P: AsRef<Path>>(path: P) -> Result<Vec<Region>, DataError> {
    read_bed3(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_regions() {
        let input = "track name=x\n# comment\nchr1\t10\t20\tname\nchr2 0 5\n";
        let regions = read_bed3(input.as_bytes()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], Region { chrom: "chr1".into(), start: 10, end: 20 });
        assert_eq!(regions[1].len(), 5);
    }

    #[test]
    fn test_reject_bad_lines() {
        assert!(read_bed3("chr1 10\n".as_bytes()).is_err());
        assert!(read_bed3("chr1 10 5\n".as_bytes()).is_err());
        assert!(read_bed3("chr1 a 5\n".as_bytes()).is_err());
    }
}
