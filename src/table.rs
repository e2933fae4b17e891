//! In-memory DBF table: header, column descriptors and records.
//!
//! Fields are crate-private. The header is only ever produced by the reader
//! (decoded from a file) or by [`TableBuilder`](crate::TableBuilder)
//! (derived from the current columns and records).

use std::fmt;

use crate::error::{DbfError, Result};
use crate::format::types::{header_total_bytes, ColumnDescriptor, Header, PackedDate};
use crate::format::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub(crate) header: Header,
    pub(crate) columns: Vec<ColumnDescriptor>,
    pub(crate) records: Vec<Record>,
}

impl Table {
    /// An empty table with no columns and no records.
    pub fn new() -> Self {
        Self {
            header: Header {
                last_updated: PackedDate::today(),
                records_cnt: 0,
                header_total_bytes: header_total_bytes(0) as u16,
                bytes_per_record: 0,
            },
            columns: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn column(&self, field_name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.field_name == field_name)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of stored field lengths.
    pub fn record_width(&self) -> usize {
        self.columns.iter().map(|c| c.field_length as usize).sum()
    }

    /// Check that the header agrees with the columns and records.
    ///
    /// Writers rely on `header_total_bytes` and `bytes_per_record` for record
    /// offsets, so a table that fails this check must not be written.
    pub fn validate_layout(&self) -> Result<()> {
        if self.header.records_cnt as usize != self.records.len() {
            return Err(DbfError::SchemaMismatch(format!(
                "header.records_cnt = {}, records.len() = {}",
                self.header.records_cnt,
                self.records.len()
            )));
        }
        let expected_total = header_total_bytes(self.columns.len());
        if self.header.header_total_bytes as usize != expected_total {
            return Err(DbfError::SchemaMismatch(format!(
                "header.header_total_bytes = {}, expected {} for {} columns",
                self.header.header_total_bytes,
                expected_total,
                self.columns.len()
            )));
        }
        if self.header.bytes_per_record as usize != self.record_width() {
            return Err(DbfError::SchemaMismatch(format!(
                "header.bytes_per_record = {}, sum of field lengths = {}",
                self.header.bytes_per_record,
                self.record_width()
            )));
        }
        Ok(())
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " --- Header --- ")?;
        writeln!(f)?;
        writeln!(f, "{}", self.header)?;

        writeln!(f, " --- Column Definitions --- ")?;
        writeln!(f)?;
        for (i, column) in self.columns.iter().enumerate() {
            writeln!(f, "column {}", i)?;
            writeln!(f, "{}", column)?;
        }

        writeln!(f, " --- Records --- ")?;
        writeln!(f)?;
        for (i, record) in self.records.iter().enumerate() {
            writeln!(f, "record {}", i)?;
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}
