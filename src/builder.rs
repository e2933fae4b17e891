//! Table mutation: column definition and validated record appends.
//!
//! ```
//! use dbftools::{Table, TableBuilder};
//!
//! # fn main() -> dbftools::Result<()> {
//! let mut table = Table::new();
//! let mut builder = TableBuilder::new(&mut table);
//! builder.set_columns([("name", 10), ("age", 3)])?;
//! builder.append_record([("name", "John"), ("age", "20")])?;
//!
//! assert_eq!(table.header().bytes_per_record, 15);
//! assert_eq!(table.header().records_cnt, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::error::{DbfError, Result};
use crate::format::types::{
    ColumnDescriptor, Header, PackedDate, MAX_FIELD_LENGTH, MAX_FIELD_NAME_LEN,
};
use crate::format::Record;
use crate::table::Table;

/// Exclusive mutation handle over a [`Table`].
///
/// Every successful mutation regenerates the header, so `records_cnt`,
/// `header_total_bytes` and `bytes_per_record` always match the table contents.
pub struct TableBuilder<'a> {
    table: &'a mut Table,
}

impl<'a> TableBuilder<'a> {
    pub fn new(table: &'a mut Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    /// Replace the column layout. `width` is the value capacity; the stored
    /// field length is `width + 1`.
    ///
    /// Rejected on a table that already holds records, since existing rows
    /// are keyed by the old column names.
    pub fn set_columns<I, S>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        if !self.table.records.is_empty() {
            return Err(DbfError::SchemaMismatch(format!(
                "cannot redefine columns on a table with {} records",
                self.table.records.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut descriptors = Vec::new();
        for (name, width) in columns {
            let name = name.into();
            if name.len() > MAX_FIELD_NAME_LEN {
                return Err(DbfError::FieldNameTooLong {
                    len: name.len(),
                    name,
                });
            }
            if width >= MAX_FIELD_LENGTH {
                return Err(DbfError::FieldTooWide { name, width });
            }
            if !seen.insert(name.clone()) {
                return Err(DbfError::SchemaMismatch(format!(
                    "duplicate column {}",
                    name
                )));
            }
            descriptors.push(ColumnDescriptor::text(name, (width + 1) as u8));
        }

        let header = regenerate_header(&descriptors, 0)?;
        self.table.columns = descriptors;
        self.table.header = header;
        Ok(())
    }

    /// Append one record. Its keys must be exactly the column names and each
    /// value must fit its column.
    ///
    /// Refused on a table whose header disagrees with its columns, such as a
    /// loaded file stored with the wider `1 + Σ field_length` record stride:
    /// new rows would land at the wrong offsets. On error the table is left
    /// unchanged.
    pub fn append_record<I, K, V>(&mut self, contents: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let contents: BTreeMap<String, String> = contents
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.table.validate_layout()?;
        let columns = &self.table.columns;

        if contents.len() != columns.len() {
            return Err(DbfError::SchemaMismatch(format!(
                "contents.len() = {}, columns.len() = {}",
                contents.len(),
                columns.len()
            )));
        }
        for column in columns {
            if !contents.contains_key(&column.field_name) {
                return Err(DbfError::SchemaMismatch(format!(
                    "Cannot find column {} in contents",
                    column.field_name
                )));
            }
        }
        for column in columns {
            let actual = contents[&column.field_name].len();
            if actual > column.capacity() {
                return Err(DbfError::ValueTooLong {
                    field: column.field_name.clone(),
                    limit: column.capacity(),
                    actual,
                });
            }
        }

        let header = regenerate_header(columns, self.table.records.len() + 1)?;
        self.table.records.push(Record::from(contents));
        self.table.header = header;
        Ok(())
    }
}

/// The header for a table with `columns` and `record_count` records, stamped
/// with today's date. Computed before a mutation is applied so a failed
/// mutation leaves the table untouched.
fn regenerate_header(columns: &[ColumnDescriptor], record_count: usize) -> Result<Header> {
    Header::derive(columns, record_count, PackedDate::today())
}
