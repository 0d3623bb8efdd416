//! Terminal output and result files
//!
//! Status lines go to stderr so that tables written to stdout stay clean.

use anyhow::{Context, Result};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Progress bar on stderr, hidden when stderr is not a terminal.
pub fn progress(len: usize, message: &str) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(bar) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(bar.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

pub fn step(message: impl AsRef<str>) {
    eprintln!("  {} {}", style("→").dim(), message.as_ref());
}

pub fn done(message: impl AsRef<str>) {
    eprintln!("  {} {}", style("✓").green(), message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    eprintln!("  {} {}", style("⚠").yellow(), message.as_ref());
}

pub fn saved(path: &Path) {
    eprintln!("  {} Saved to {}", style("💾").cyan(), path.display());
}

/// `BASENAME` with `suffix` appended to the file name.
pub fn suffixed(basename: &Path, suffix: &str) -> PathBuf {
    let mut name = basename.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Buffered writer for `path`, or stdout when no path is given.
pub fn writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Create `path` and hand a buffered writer to `f`.
pub fn write_file<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    f(&mut w).with_context(|| format!("Failed to write {}", path.display()))?;
    w.flush()?;
    Ok(())
}

/// Format probabilities as `p1,p2,...`.
pub fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
