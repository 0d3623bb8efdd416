//! Score table reader and writer
//!
//! Two layouts are accepted:
//!
//! **Comma-separated rows** (optional header, optional leading name column):
//! ```text
//! 0.12,3.4,0.0
//! 1.50,0.0,2.2
//! ```
//!
//! **GRanges export** with a whitespace-separated header that contains a
//! `counts` column whose cells hold comma-separated numbers:
//! ```text
//! seqnames start end counts
//! chr1 100 200 0.12,3.4,0.0
//! ```

use super::DataError;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Detected table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    GRanges { counts_column: usize },
}

impl TableFormat {
    /// Detect the layout from the first non-empty line.
    pub fn detect(first_line: &str) -> Self {
        let fields: Vec<&str> = first_line.split_whitespace().collect();
        match fields.iter().position(|f| f.trim_matches('"') == "counts") {
            Some(counts_column) => TableFormat::GRanges { counts_column },
            None => TableFormat::Csv,
        }
    }
}

/// Rows of numeric scores, one per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub names: Vec<Option<String>>,
    pub rows: Vec<Vec<f64>>,
    pub n_columns: usize,
}

impl ScoreTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Heuristic: a CSV line is a header if most of its first fields are not numbers.
fn is_header(line: &str) -> bool {
    let fields: Vec<&str> = line.split(',').collect();
    let checked = fields.len().min(5);
    let non_numeric = fields
        .iter()
        .take(5)
        .filter(|f| f.trim().parse::<f64>().is_err())
        .count();
    non_numeric > checked / 2
}

fn parse_numbers(cells: &[&str], lineno: usize) -> Result<Vec<f64>, DataError> {
    cells
        .iter()
        .map(|c| {
            let c = c.trim().trim_matches('"');
            if c.eq_ignore_ascii_case("na") {
                return Ok(f64::NAN);
            }
            c.parse::<f64>().map_err(|_| {
                DataError::InvalidFormat(format!("line {}: invalid number `{}`", lineno + 1, c))
            })
        })
        .collect()
}

/// Read a score table from a stream.
pub fn read_score_table<R: BufRead>(reader: R) -> Result<ScoreTable, DataError> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut numbered = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

    let (first_no, first) = match numbered.next() {
        Some(first) => first,
        None => {
            return Ok(ScoreTable {
                names: Vec::new(),
                rows: Vec::new(),
                n_columns: 0,
            })
        }
    };

    let format = TableFormat::detect(first);
    let mut names = Vec::new();
    let mut rows = Vec::new();

    match format {
        TableFormat::GRanges { counts_column } => {
            for (lineno, line) in numbered {
                let fields: Vec<&str> = line.split_whitespace().collect();
                // exported row names shift columns right by one
                let offset = fields.len().saturating_sub(counts_column + 1).min(1);
                let cell = fields.get(counts_column + offset).ok_or_else(|| {
                    DataError::InvalidFormat(format!("line {}: missing counts column", lineno + 1))
                })?;
                let cells: Vec<&str> = cell.split(',').collect();
                rows.push(parse_numbers(&cells, lineno)?);
                names.push(fields.first().map(|s| s.trim_matches('"').to_string()));
            }
        }
        TableFormat::Csv => {
            let header = is_header(first);
            let data_lines = std::iter::once((first_no, first))
                .filter(|_| !header)
                .chain(numbered);
            for (lineno, line) in data_lines {
                let fields: Vec<&str> = line.split(',').collect();
                let named = fields
                    .first()
                    .map(|f| f.trim().parse::<f64>().is_err() && !f.trim().eq_ignore_ascii_case("na"))
                    .unwrap_or(false);
                if named {
                    names.push(Some(fields[0].trim().to_string()));
                    rows.push(parse_numbers(&fields[1..], lineno)?);
                } else {
                    names.push(None);
                    rows.push(parse_numbers(&fields, lineno)?);
                }
            }
        }
    }

    let n_columns = rows.first().map(|r| r.len()).unwrap_or(0);
    for row in &rows {
        if row.len() != n_columns {
            return Err(DataError::DimensionMismatch {
                expected: n_columns,
                got: row.len(),
            });
        }
    }
    Ok(ScoreTable {
        names,
        rows,
        n_columns,
    })
}

pub fn read_score_table_file<P: AsRef<Path>>(path: P) -> Result<ScoreTable, DataError> {
    read_score_table(BufReader::new(File::open(path)?))
}

/// Write rows as comma-separated values, optionally preceded by a header.
pub fn write_score_table<W: Write>(
    mut writer: W,
    header: Option<&[String]>,
    rows: &[Vec<f64>],
) -> Result<(), DataError> {
    if let Some(header) = header {
        writeln!(writer, "{}", header.join(","))?;
    }
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_csv() {
        let table = read_score_table("1.0,2.0,3.0\n4.0,0,6\n".as_bytes()).unwrap();
        assert_eq!(table.n_columns, 3);
        assert_eq!(table.rows[1], vec![4.0, 0.0, 6.0]);
        assert_eq!(table.names, vec![None, None]);
    }

    #[test]
    fn test_csv_with_header_and_names() {
        let input = "id,a,b\ns1,1.5,2\ns2,0,1\n";
        let table = read_score_table(input.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.n_columns, 2);
        assert_eq!(table.names[0].as_deref(), Some("s1"));
        assert_eq!(table.rows[0], vec![1.5, 2.0]);
    }

    #[test]
    fn test_granges_counts_column() {
        let input = "seqnames start end counts\nchr1 0 10 1,2,3\nchr1 10 20 0,0,5\n";
        assert_eq!(
            TableFormat::detect("seqnames start end counts"),
            TableFormat::GRanges { counts_column: 3 }
        );
        let table = read_score_table(input.as_bytes()).unwrap();
        assert_eq!(table.rows, vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 5.0]]);
    }

    #[test]
    fn test_granges_with_row_names() {
        let input = "seqnames start end counts\n\"1\" chr1 0 10 1,2\n";
        let table = read_score_table(input.as_bytes()).unwrap();
        assert_eq!(table.rows, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = read_score_table("1,2,3\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.table");
        let rows = vec![vec![1.0, 0.5], vec![-2.0, 0.0]];
        write_score_table(
            File::create(&path).unwrap(),
            Some(&["x".to_string(), "y".to_string()]),
            &rows,
        )
        .unwrap();
        let table = read_score_table_file(&path).unwrap();
        assert_eq!(table.rows, rows);
    }
}
