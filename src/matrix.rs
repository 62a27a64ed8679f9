//! Matrix batch streamer - lazy batches over MTX data files
//!
//! Sparse expression matrices can run to many millions of entries, so the
//! file is never held in memory whole. `MatrixBatches` walks the file line
//! by line and yields fixed-size batches of normalized triples; bounding
//! accumulation to one batch keeps peak memory flat while batch-sized bulk
//! inserts amortize per-statement overhead.
//!
//! The stream is one-pass and non-restartable: it owns the file handle and
//! yields immutable batch values, with no cursor shared with callers.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Default number of triples per batch
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// One nonzero entry of a sparse expression matrix.
///
/// `row` and `col` are 1-based ordinals into the row/column identifier
/// indexes; no range validation happens at parse time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixTriple {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Lazy iterator of triple batches over an MTX data file.
///
/// Yields `Vec<MatrixTriple>` batches of exactly the configured size, in
/// file order, except the final batch which may be shorter or empty. The
/// in-progress batch is always emitted after the last line, so a file with
/// zero data lines yields exactly one empty batch. Comment lines (first
/// non-whitespace character `%`) are skipped and never count toward batch
/// accounting.
///
/// A malformed line ends the stream: the error is yielded and the iterator
/// is fused afterwards.
pub struct MatrixBatches {
    lines: Lines<BufReader<File>>,
    batch_size: usize,
    line_no: u64,
    done: bool,
}

impl MatrixBatches {
    /// Open an MTX data file for streaming.
    ///
    /// `batch_size` is clamped to a minimum of 1.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            batch_size: batch_size.max(1),
            line_no: 0,
            done: false,
        })
    }

    /// Open with the default batch size of 1024
    pub fn open_default(path: &Path) -> Result<Self> {
        Self::open(path, DEFAULT_BATCH_SIZE)
    }
}

impl Iterator for MatrixBatches {
    type Item = Result<Vec<MatrixTriple>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        loop {
            match self.lines.next() {
                None => {
                    // Final batch, emitted even when empty
                    self.done = true;
                    return Some(Ok(batch));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(line)) => {
                    self.line_no += 1;
                    let data = line.trim();
                    if data.starts_with('%') {
                        continue;
                    }
                    match parse_triple(data, self.line_no) {
                        Ok(triple) => {
                            batch.push(triple);
                            if batch.len() == self.batch_size {
                                return Some(Ok(batch));
                            }
                        }
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

/// Parse one data line as `<row_ordinal> <col_ordinal> <value>`.
fn parse_triple(line: &str, line_no: u64) -> Result<MatrixTriple> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != 3 {
        return Err(Error::Parse(format!(
            "line {}: expected 3 space-separated fields, got {}",
            line_no,
            fields.len()
        )));
    }

    let row = fields[0].parse::<usize>().map_err(|e| {
        Error::Parse(format!("line {}: invalid row ordinal '{}': {}", line_no, fields[0], e))
    })?;
    let col = fields[1].parse::<usize>().map_err(|e| {
        Error::Parse(format!("line {}: invalid column ordinal '{}': {}", line_no, fields[1], e))
    })?;
    let value = fields[2].parse::<f64>().map_err(|e| {
        Error::Parse(format!("line {}: invalid value '{}': {}", line_no, fields[2], e))
    })?;

    Ok(MatrixTriple { row, col, value })
}
