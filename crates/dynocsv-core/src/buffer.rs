//! Row buffer that defers the CSV header until the column set settles.
//!
//! While buffering, rows are kept in memory as positional vectors laid out
//! against the column order known at the time each row arrived. Earlier rows
//! are therefore shorter than later ones whenever new attributes show up.
//! On flush the header is written once and every buffered row is padded to
//! the header width. After that, rows stream straight to the writer and the
//! buffer never refills.

use std::collections::HashMap;
use std::io;

use crate::attributes::positional_row;
use crate::error::{ExportError, ExportResult};

/// Rows held in memory before the header is committed.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Two-state CSV sink: buffering, then flushed.
pub struct RowBuffer<W: io::Write> {
    writer: csv::Writer<W>,
    rows: Vec<Vec<String>>,
    capacity: usize,
    flushed: bool,
}

impl<W: io::Write> std::fmt::Debug for RowBuffer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowBuffer")
            .field("buffered", &self.rows.len())
            .field("capacity", &self.capacity)
            .field("flushed", &self.flushed)
            .finish_non_exhaustive()
    }
}

impl<W: io::Write> RowBuffer<W> {
    /// Start in the buffering state. A zero capacity is treated as one.
    pub fn new(sink: W, capacity: usize) -> Self {
        Self {
            writer: csv_writer(sink),
            rows: Vec::new(),
            capacity: capacity.max(1),
            flushed: false,
        }
    }

    /// Start already flushed, with `header` written up front. Used when the
    /// columns are fixed by the caller and nothing needs to be held back.
    pub fn with_header(sink: W, header: &[String]) -> ExportResult<Self> {
        let mut buffer = Self::new(sink, 1);
        buffer.flush(header)?;
        Ok(buffer)
    }

    /// Whether the header has been committed.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.rows.len()
    }

    /// Accept one record laid out against `order`.
    ///
    /// Once flushed the row goes straight to the writer. Otherwise it is
    /// buffered, and reaching capacity flushes with `order` as the header.
    pub fn offer(&mut self, values: &HashMap<String, String>, order: &[String]) -> ExportResult<()> {
        let row = positional_row(values, order);
        if self.flushed {
            self.writer.write_record(&row)?;
            return Ok(());
        }

        self.rows.push(row);
        if self.rows.len() >= self.capacity {
            self.flush(order)?;
        }
        Ok(())
    }

    /// Commit `header` and drain the buffer, padding short rows.
    ///
    /// The header is written only on the first call, and only if it is not
    /// empty. Later calls just flush the underlying writer.
    pub fn flush(&mut self, header: &[String]) -> ExportResult<()> {
        if !self.flushed {
            if !header.is_empty() {
                self.writer.write_record(header)?;
            }
            let width = header.len();
            for mut row in self.rows.drain(..) {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                self.writer.write_record(&row)?;
            }
            self.flushed = true;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the destination.
    pub fn finish(mut self) -> ExportResult<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

fn csv_writer<W: io::Write>(sink: W) -> csv::Writer<W> {
    // Rows can legitimately differ in width once the header is out.
    csv::WriterBuilder::new().flexible(true).from_writer(sink)
}
