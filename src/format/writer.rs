//! Table writer.
//!
//! Places the header, column descriptors, terminator and records at their
//! fixed offsets. `dump_all` rewrites the whole table; `dump_part` rewrites a
//! row range plus the header, for appending rows to an existing file.
//!
//! ## Binary layout
//!
//! ```text
//! [Header 32 bytes]
//! [Column descriptor 32 bytes × N]
//! [0x0D terminator]
//! [Record bytes_per_record × records_cnt]
//! [0x1A end marker]
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{DbfError, Result};
use crate::format::types::*;
use crate::table::Table;

/// Writer over one output stream. The stream is held for the writer's lifetime.
pub struct TableWriter<W = BufWriter<File>> {
    inner: W,
}

impl TableWriter<BufWriter<File>> {
    /// Open a table file in place. Existing bytes are kept unless overwritten
    /// by position; the file is created if missing.
    ///
    /// Dumping a smaller table than the one stored leaves the old tail after
    /// the end marker. Call [`truncate`](Self::truncate) to drop it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| DbfError::IoUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Create a fresh table file, truncating any existing content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| DbfError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Flush, then cut the file right after the end marker of `table`.
    pub fn truncate(&mut self, table: &Table) -> Result<()> {
        table.validate_layout()?;
        self.inner.flush()?;
        let len = record_offset(
            table.columns.len(),
            table.header.bytes_per_record,
            table.records.len(),
        ) + 1;
        self.inner.get_ref().set_len(len)?;
        tracing::debug!(len, "Truncated table file");
        Ok(())
    }
}

impl<W: Write + Seek> TableWriter<W> {
    /// Wrap an already-open stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write the whole table.
    ///
    /// Required after any change to the column layout, since record offsets
    /// depend on `header_total_bytes` and `bytes_per_record`. All structures
    /// are encoded before the first byte is written.
    pub fn dump_all(&mut self, table: &Table) -> Result<()> {
        table.validate_layout()?;

        let mut descriptors = Vec::with_capacity(table.columns.len() * DESCRIPTOR_SIZE);
        for column in &table.columns {
            column.write_to(&mut descriptors)?;
        }
        let records = encode_rows(table, 0, table.records.len())?;

        self.write_at(0, &table.header.to_bytes())?;
        self.write_at(descriptor_offset(0), &descriptors)?;
        self.write_at(terminator_offset(table.columns.len()), &[DESCRIPTOR_TERMINATOR])?;
        self.write_at(self.row_offset(table, 0), &records)?;
        self.write_end_marker(table)?;

        tracing::debug!(
            columns = table.columns.len(),
            records = table.records.len(),
            "Dumped table"
        );
        Ok(())
    }

    /// Write records `[row_begin, row_end)` at their offsets, then the header.
    ///
    /// Rows must start within the existing stream: this cannot skip over rows
    /// that were never written.
    pub fn dump_part(&mut self, table: &Table, row_begin: usize, row_end: usize) -> Result<()> {
        if row_end > table.records.len() || row_begin > row_end {
            return Err(DbfError::InvalidRange(format!(
                "row_begin = {}, row_end = {}, records.len() = {}",
                row_begin,
                row_end,
                table.records.len()
            )));
        }
        table.validate_layout()?;

        let begin_pos = self.row_offset(table, row_begin);
        let file_size = self.inner.seek(SeekFrom::End(0))?;
        if begin_pos > file_size {
            return Err(DbfError::InvalidRange(format!(
                "row_begin = {} starts at {}, file_size = {}",
                row_begin, begin_pos, file_size
            )));
        }

        let records = encode_rows(table, row_begin, row_end)?;
        self.write_at(begin_pos, &records)?;
        self.write_at(0, &table.header.to_bytes())?;
        self.write_end_marker(table)?;

        tracing::debug!(row_begin, row_end, "Dumped rows");
        Ok(())
    }

    /// Push buffered bytes to the underlying stream. The stream stays open.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    fn row_offset(&self, table: &Table, index: usize) -> u64 {
        record_offset(table.columns.len(), table.header.bytes_per_record, index)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Place the end marker right after the last record.
    fn write_end_marker(&mut self, table: &Table) -> Result<()> {
        let data_end = self.row_offset(table, table.records.len());
        let file_size = self.inner.seek(SeekFrom::End(0))?;
        if file_size > data_end + 1 {
            tracing::warn!(
                data_end,
                file_size,
                "Stream holds bytes past the end of table data"
            );
        }
        self.write_at(data_end, &[END_OF_FILE_MARKER])
    }
}

fn encode_rows(table: &Table, row_begin: usize, row_end: usize) -> Result<Vec<u8>> {
    let width = table.header.bytes_per_record as usize;
    let mut buf = Vec::with_capacity((row_end - row_begin) * width);
    for record in &table.records[row_begin..row_end] {
        record.write_to(&mut buf, &table.columns)?;
    }
    Ok(buf)
}
