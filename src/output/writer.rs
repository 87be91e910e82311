//! CSV artifact writer
//!
//! Writes a header of destination labels followed by formatted rows to a
//! local file. Either the whole artifact is written and flushed, or the
//! write fails and the partial file is removed.

use crate::error::{Error, Result};
use crate::loader::{CsvFormatDef, LineTerminator};
use crate::types::FormattedRow;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Configuration for the CSV writer
#[derive(Debug, Clone)]
pub struct CsvWriterConfig {
    delimiter: u8,
    terminator: Terminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::CRLF,
        }
    }
}

impl CsvWriterConfig {
    /// Create a new config with default settings (`,` and `\r\n`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the record terminator
    #[must_use]
    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = match terminator {
            LineTerminator::Crlf => Terminator::CRLF,
            LineTerminator::Lf => Terminator::Any(b'\n'),
        };
        self
    }

    fn builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .quote_style(QuoteStyle::Necessary)
            .has_headers(false);
        builder
    }
}

impl From<&CsvFormatDef> for CsvWriterConfig {
    fn from(def: &CsvFormatDef) -> Self {
        // Validated as ASCII when the definition is loaded
        let delimiter = u8::try_from(def.delimiter).unwrap_or(b',');
        Self::new()
            .with_delimiter(delimiter)
            .with_terminator(def.line_terminator)
    }
}

/// Streaming CSV file writer
pub struct CsvWriter {
    writer: csv::Writer<BufWriter<File>>,
    path: String,
    columns: usize,
    rows_written: usize,
}

impl CsvWriter {
    /// Create (or truncate) the file at `path` and write the header record
    pub fn new(
        path: impl AsRef<Path>,
        labels: &[String],
        config: &CsvWriterConfig,
    ) -> Result<Self> {
        let display = path.as_ref().display().to_string();
        let file = File::create(path.as_ref())
            .map_err(|e| Error::write(&display, format!("Failed to create file: {e}")))?;

        let mut writer = Self {
            writer: config.builder().from_writer(BufWriter::new(file)),
            path: display,
            columns: labels.len(),
            rows_written: 0,
        };
        writer
            .writer
            .write_record(labels)
            .map_err(|e| Error::write(&writer.path, e.to_string()))?;
        Ok(writer)
    }

    /// Write one data row
    pub fn write(&mut self, row: &FormattedRow) -> Result<()> {
        if row.len() != self.columns {
            return Err(Error::write(
                &self.path,
                format!(
                    "Row has {} fields but header has {}",
                    row.len(),
                    self.columns
                ),
            ));
        }

        self.writer
            .write_record(row.fields())
            .map_err(|e| Error::write(&self.path, e.to_string()))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Get the number of data rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and sync the file to disk, returning the row count
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        let path = self.path;
        let buffered = self
            .writer
            .into_inner()
            .map_err(|e| Error::write(&path, format!("Failed to flush: {}", e.error())))?;
        let file = buffered
            .into_inner()
            .map_err(|e| Error::write(&path, format!("Failed to flush: {}", e.error())))?;
        file.sync_all()
            .map_err(|e| Error::write(&path, format!("Failed to sync: {e}")))?;
        Ok(rows)
    }
}

/// Write a complete artifact: header plus every row
///
/// On failure the file at `path` is removed so a truncated artifact can never
/// be mistaken for a complete one.
pub fn write_csv(
    path: impl AsRef<Path>,
    labels: &[String],
    rows: &[FormattedRow],
    config: &CsvWriterConfig,
) -> Result<usize> {
    let path = path.as_ref();

    let result = CsvWriter::new(path, labels, config).and_then(|mut writer| {
        for row in rows {
            writer.write(row)?;
        }
        writer.close()
    });

    if result.is_err() && path.exists() {
        let _ = std::fs::remove_file(path);
    }
    result
}
