//! Wiggle (fixedStep) writer

use std::io::{self, Write};

/// Writes region-scored values as `fixedStep` wiggle blocks.
pub struct WiggleWriter<W: Write> {
    writer: W,
}

impl<W: Write> WiggleWriter<W> {
    /// Start a track with the given name.
    pub fn new(mut writer: W, name: &str) -> io::Result<Self> {
        writeln!(writer, "track type=wiggle_0 name=\"{}\"", name)?;
        Ok(Self { writer })
    }

    /// Write one block. `start` is 0-based; wiggle coordinates are 1-based.
    pub fn write_block(
        &mut self,
        chrom: &str,
        start: usize,
        step: usize,
        span: usize,
        values: &[f64],
    ) -> io::Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        writeln!(
            self.writer,
            "fixedStep chrom={} start={} step={} span={}",
            chrom,
            start + 1,
            step,
            span
        )?;
        for v in values {
            writeln!(self.writer, "{}", v)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_block() {
        let mut w = WiggleWriter::new(Vec::new(), "pred").unwrap();
        w.write_block("chr1", 0, 10, 20, &[0.5, 0.25]).unwrap();
        w.write_block("chr2", 5, 10, 20, &[]).unwrap();
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "track type=wiggle_0 name=\"pred\"\nfixedStep chrom=chr1 start=1 step=10 span=20\n0.5\n0.25\n"
        );
    }
}
