//! FASTA reader

use super::DataError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One FASTA record. Sequences are stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Read all records from a FASTA stream.
pub fn read_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>, DataError> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            records.push(FastaRecord {
                name: header.trim().to_string(),
                sequence: Vec::new(),
            });
        } else {
            let record = records.last_mut().ok_or_else(|| {
                DataError::InvalidFormat(format!(
                    "line {}: sequence data before first FASTA header",
                    lineno + 1
                ))
            })?;
            record
                .sequence
                .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()).map(|b| b.to_ascii_lowercase()));
        }
    }
    Ok(records)
}

/// Read all records from a FASTA file.
pub fn read_fasta_file<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, DataError> {
    let file = File::open(path)?;
    read_fasta(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_record() {
        let input = ">seq1 description\nACGT\nacgt\n\n>seq2\nNNAC\n";
        let records = read_fasta(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "seq1 description");
        assert_eq!(records[0].sequence, b"acgtacgt".to_vec());
        assert_eq!(records[1].sequence, b"nnac".to_vec());
    }

    #[test]
    fn test_data_before_header() {
        assert!(read_fasta("ACGT\n>x\nA\n".as_bytes()).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(read_fasta("".as_bytes()).unwrap().is_empty());
    }
}
