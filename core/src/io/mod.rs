//! Input/output for sequences, regions, score tables and wiggle tracks
//!
//! # Supported Formats
//!
//! - **FASTA**: multi-record sequence files
//! - **BED3**: genomic regions (`chrom start end`, 0-based half-open)
//! - **Score tables**: comma-separated rows, or a GRanges export with a
//!   `counts` column
//! - **Wiggle**: `fixedStep` tracks for region-scored predictions
//!
//! # Example
//!
//! ```rust,ignore
//! use kmerlr_core::io::{read_fasta_file, read_score_table_file};
//!
//! let records = read_fasta_file("foreground.fa")?;
//! let scores = read_score_table_file("scores.table")?;
//! ```

mod bed;
mod fasta;
mod table;
mod wiggle;

pub use bed::{read_bed3, read_bed3_file, Region};
pub use fasta::{read_fasta, read_fasta_file, FastaRecord};
pub use table::{
    read_score_table, read_score_table_file, write_score_table, ScoreTable, TableFormat,
};
pub use wiggle::WiggleWriter;

use thiserror::Error;

/// Errors raised by malformed or inconsistent input data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Feature id {id} out of range for {n} base features")]
    FeatureOutOfRange { id: usize, n: usize },

    #[error("Sample {0} has no label")]
    MissingLabel(usize),

    #[error("Empty data: {0}")]
    EmptyData(String),
}
