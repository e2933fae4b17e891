//! Table reader.
//!
//! Loads a whole table from a byte stream, or incrementally picks up records
//! appended since a table was last loaded.
//!
//! ```no_run
//! use dbftools::TableReader;
//!
//! # fn main() -> dbftools::Result<()> {
//! let mut reader = TableReader::open("trade.dbf")?;
//! let mut table = reader.load_table()?;
//!
//! // ... later, after another process appended rows:
//! let (old_count, new_count) = reader.update_table(&mut table)?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{DbfError, Result};
use crate::format::record::Record;
use crate::format::types::*;
use crate::table::Table;

/// Reader over one input stream. The stream is held for the reader's lifetime.
pub struct TableReader<R = BufReader<File>> {
    inner: R,
}

impl TableReader<BufReader<File>> {
    /// Open a table file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DbfError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> TableReader<R> {
    /// Wrap an already-open stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decode header, column descriptors and all records.
    ///
    /// Every structure is bounds-checked against the stream length before it
    /// is read. No table is returned on failure.
    pub fn load_table(&mut self) -> Result<Table> {
        let file_size = self.stream_len()?;
        let header = self.load_header(file_size)?;

        // header_total_bytes = header(32) + columns_count * 32 + terminator(1)
        let columns_cnt = header.columns_count();
        let mut columns = Vec::with_capacity(columns_cnt);
        for i in 0..columns_cnt {
            columns.push(self.load_column(i, file_size)?);
        }
        check_record_width(&header, &columns);

        let mut records = Vec::new();
        for i in 0..header.records_cnt as usize {
            records.push(self.load_record(&columns, header.bytes_per_record, i, file_size)?);
        }

        tracing::debug!(
            columns = columns.len(),
            records = records.len(),
            bytes = file_size,
            "Loaded table"
        );

        Ok(Table {
            header,
            columns,
            records,
        })
    }

    /// Append records written since `table` was loaded.
    ///
    /// Only the header and the new records are read; the existing column
    /// layout is reused. Returns `(old_count, new_count)`. When the stream
    /// does not hold more records than the table, nothing is read and the
    /// table is left as is.
    pub fn update_table(&mut self, table: &mut Table) -> Result<(usize, usize)> {
        let file_size = self.stream_len()?;
        let header = self.load_header(file_size)?;

        let old_count = table.record_count();
        let new_count = header.records_cnt as usize;

        if new_count <= old_count {
            if new_count < old_count {
                tracing::warn!(
                    old_count,
                    new_count,
                    "Record count shrank since last load, table left unchanged"
                );
            }
            return Ok((old_count, new_count));
        }

        if header.header_total_bytes != table.header.header_total_bytes
            || header.bytes_per_record != table.header.bytes_per_record
        {
            return Err(DbfError::SchemaMismatch(format!(
                "file layout changed since last load: header_total_bytes {} -> {}, bytes_per_record {} -> {}",
                table.header.header_total_bytes,
                header.header_total_bytes,
                table.header.bytes_per_record,
                header.bytes_per_record
            )));
        }

        let mut new_records = Vec::with_capacity(new_count - old_count);
        for i in old_count..new_count {
            new_records.push(self.load_record(
                &table.columns,
                table.header.bytes_per_record,
                i,
                file_size,
            )?);
        }

        tracing::debug!(old_count, new_count, "Picked up appended records");

        table.records.extend(new_records);
        table.header = header;
        Ok((old_count, new_count))
    }

    fn stream_len(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    /// Read `len` bytes at `offset`, failing if the stream is too short.
    fn read_window(
        &mut self,
        structure: &'static str,
        offset: u64,
        len: usize,
        file_size: u64,
    ) -> Result<Vec<u8>> {
        let required = offset + len as u64;
        if required > file_size {
            return Err(DbfError::TruncatedInput {
                structure,
                required,
                actual: file_size,
            });
        }
        let mut buf = vec![0u8; len];
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn load_header(&mut self, file_size: u64) -> Result<Header> {
        let buf = self.read_window("header", 0, HEADER_SIZE, file_size)?;
        Header::from_bytes(&buf)
    }

    fn load_column(&mut self, index: usize, file_size: u64) -> Result<ColumnDescriptor> {
        let buf = self.read_window(
            "column descriptor",
            descriptor_offset(index),
            DESCRIPTOR_SIZE,
            file_size,
        )?;
        let column = ColumnDescriptor::from_bytes(&buf)?;
        if column.field_type != FIELD_TYPE_TEXT {
            tracing::warn!(
                field = column.field_name.as_str(),
                field_type = %(column.field_type as char),
                "Non-text field decoded as text"
            );
        }
        Ok(column)
    }

    fn load_record(
        &mut self,
        columns: &[ColumnDescriptor],
        bytes_per_record: u16,
        index: usize,
        file_size: u64,
    ) -> Result<Record> {
        let width = bytes_per_record as usize;
        let offset = record_offset(columns.len(), bytes_per_record, index);
        let buf = self.read_window("record", offset, width, file_size)?;
        Record::from_bytes(&buf, width, columns)
    }
}

/// Warn when the header's record width matches neither layout the record
/// codec understands.
fn check_record_width(header: &Header, columns: &[ColumnDescriptor]) {
    let sum: usize = columns.iter().map(|c| c.field_length as usize).sum();
    let width = header.bytes_per_record as usize;
    if width != sum && width != sum + 1 {
        tracing::warn!(
            bytes_per_record = width,
            field_lengths = sum,
            "Record width disagrees with column descriptors"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::builder::TableBuilder;
    use crate::format::writer::TableWriter;

    fn people_table() -> Table {
        let mut table = Table::new();
        let mut builder = TableBuilder::new(&mut table);
        builder.set_columns([("name", 10), ("age", 3)]).unwrap();
        builder.append_record([("name", "John"), ("age", "20")]).unwrap();
        builder.append_record([("name", "Mary"), ("age", "21")]).unwrap();
        builder.append_record([("name", "Tom"), ("age", "22")]).unwrap();
        table
    }

    fn encode(table: &Table) -> Vec<u8> {
        let mut writer = TableWriter::new(Cursor::new(Vec::new()));
        writer.dump_all(table).unwrap();
        writer.into_inner().into_inner()
    }

    #[test]
    fn test_load_roundtrip() {
        let table = people_table();
        let bytes = encode(&table);
        let loaded = TableReader::new(Cursor::new(bytes)).load_table().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_load_empty_table() {
        let mut table = Table::new();
        TableBuilder::new(&mut table)
            .set_columns([("code", 6)])
            .unwrap();
        let loaded = TableReader::new(Cursor::new(encode(&table)))
            .load_table()
            .unwrap();
        assert_eq!(loaded.columns().len(), 1);
        assert!(loaded.records().is_empty());
    }

    #[test]
    fn test_load_truncated_header() {
        let bytes = encode(&people_table());
        let err = TableReader::new(Cursor::new(bytes[..20].to_vec()))
            .load_table()
            .unwrap_err();
        match err {
            DbfError::TruncatedInput { structure, required, actual } => {
                assert_eq!(structure, "header");
                assert_eq!(required, 32);
                assert_eq!(actual, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_truncated_descriptor() {
        let bytes = encode(&people_table());
        let err = TableReader::new(Cursor::new(bytes[..70].to_vec()))
            .load_table()
            .unwrap_err();
        match err {
            DbfError::TruncatedInput { structure, required, actual } => {
                assert_eq!(structure, "column descriptor");
                assert_eq!(required, 96);
                assert_eq!(actual, 70);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_truncated_record() {
        let bytes = encode(&people_table());
        // header 97 bytes + 2 full records + part of the third
        let cut = 97 + 15 * 2 + 5;
        let err = TableReader::new(Cursor::new(bytes[..cut].to_vec()))
            .load_table()
            .unwrap_err();
        match err {
            DbfError::TruncatedInput { structure, required, actual } => {
                assert_eq!(structure, "record");
                assert_eq!(required, 97 + 15 * 3);
                assert_eq!(actual, cut as u64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_update_no_change() {
        let table = people_table();
        let bytes = encode(&table);
        let mut reader = TableReader::new(Cursor::new(bytes));
        let mut loaded = reader.load_table().unwrap();
        assert_eq!(reader.update_table(&mut loaded).unwrap(), (3, 3));
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_update_shrunk_file_leaves_table() {
        let mut table = people_table();
        let mut small = Table::new();
        let mut builder = TableBuilder::new(&mut small);
        builder.set_columns([("name", 10), ("age", 3)]).unwrap();
        builder.append_record([("name", "Ann"), ("age", "30")]).unwrap();

        let mut reader = TableReader::new(Cursor::new(encode(&small)));
        let before = table.clone();
        assert_eq!(reader.update_table(&mut table).unwrap(), (3, 1));
        assert_eq!(table, before);
    }

    #[test]
    fn test_update_picks_up_new_records() {
        let mut stale = people_table();
        let mut fresh = stale.clone();
        let mut builder = TableBuilder::new(&mut fresh);
        builder.append_record([("name", "Ann"), ("age", "30")]).unwrap();
        builder.append_record([("name", "Bob"), ("age", "31")]).unwrap();

        let mut reader = TableReader::new(Cursor::new(encode(&fresh)));
        assert_eq!(reader.update_table(&mut stale).unwrap(), (3, 5));
        assert_eq!(stale.record_count(), 5);
        assert_eq!(stale.header().records_cnt, 5);
        assert_eq!(stale.records()[4].get("name"), Some("Bob"));
        assert_eq!(stale, fresh);
    }

    #[test]
    fn test_update_rejects_changed_layout() {
        let mut stale = people_table();
        let mut other = Table::new();
        let mut builder = TableBuilder::new(&mut other);
        builder.set_columns([("code", 6)]).unwrap();
        for i in 0..5 {
            builder.append_record([("code", format!("{:06}", i))]).unwrap();
        }

        let before = stale.clone();
        let mut reader = TableReader::new(Cursor::new(encode(&other)));
        let err = reader.update_table(&mut stale).unwrap_err();
        assert!(matches!(err, DbfError::SchemaMismatch(_)));
        assert_eq!(stale, before);
    }

    /// Hand-built file with width = 1 + Σ field_length.
    fn conventional_bytes() -> Vec<u8> {
        let columns = vec![
            ColumnDescriptor::text("CODE", 6),
            ColumnDescriptor::text("QTY", 4),
        ];
        let header = Header {
            last_updated: PackedDate::new(124, 6, 1),
            records_cnt: 2,
            header_total_bytes: header_total_bytes(2) as u16,
            bytes_per_record: 11,
        };
        let mut bytes = header.to_bytes().to_vec();
        for column in &columns {
            bytes.extend_from_slice(&column.to_bytes().unwrap());
        }
        bytes.push(DESCRIPTOR_TERMINATOR);
        bytes.extend_from_slice(b" 600000 100");
        bytes.extend_from_slice(b"*000001   5");
        bytes.push(END_OF_FILE_MARKER);
        bytes
    }

    #[test]
    fn test_load_conventional_layout() {
        let table = TableReader::new(Cursor::new(conventional_bytes()))
            .load_table()
            .unwrap();
        assert_eq!(table.records()[0].get("CODE"), Some("600000"));
        assert_eq!(table.records()[0].get("QTY"), Some("100"));
        assert_eq!(table.records()[1].get("CODE"), Some("000001"));
        assert_eq!(table.records()[1].get("QTY"), Some("5"));
    }

    #[test]
    fn test_conventional_layout_is_read_only() {
        let bytes = conventional_bytes();
        let mut table = TableReader::new(Cursor::new(bytes.clone()))
            .load_table()
            .unwrap();
        let before = table.clone();

        let err = TableBuilder::new(&mut table)
            .append_record([("CODE", "12345"), ("QTY", "7")])
            .unwrap_err();
        assert!(matches!(err, DbfError::SchemaMismatch(_)));
        assert_eq!(table, before);

        let mut writer = TableWriter::new(Cursor::new(bytes.clone()));
        let err = writer.dump_part(&table, 2, 2).unwrap_err();
        assert!(matches!(err, DbfError::SchemaMismatch(_)));
        assert_eq!(writer.into_inner().into_inner(), bytes);

        let reloaded = TableReader::new(Cursor::new(bytes)).load_table().unwrap();
        assert_eq!(reloaded.records()[1].get("CODE"), Some("000001"));
        assert_eq!(reloaded.records()[1].get("QTY"), Some("5"));
    }

    #[test]
    fn test_update_truncated_leaves_table() {
        let mut stale = people_table();
        let mut fresh = stale.clone();
        let mut builder = TableBuilder::new(&mut fresh);
        builder.append_record([("name", "Ann"), ("age", "30")]).unwrap();
        builder.append_record([("name", "Bob"), ("age", "31")]).unwrap();

        // header says 5 records; the file ends inside the fourth
        let cut = 97 + 15 * 3 + 5;
        let bytes = encode(&fresh)[..cut].to_vec();
        let before = stale.clone();
        let err = TableReader::new(Cursor::new(bytes))
            .update_table(&mut stale)
            .unwrap_err();
        match err {
            DbfError::TruncatedInput { structure, required, actual } => {
                assert_eq!(structure, "record");
                assert_eq!(required, 97 + 15 * 4);
                assert_eq!(actual, cut as u64);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stale, before);
    }

    #[test]
    fn test_open_missing_file() {
        let err = TableReader::open("/definitely/not/here.dbf").err().unwrap();
        assert!(matches!(err, DbfError::IoUnavailable { .. }));
        assert_eq!(err.code(), "IO_UNAVAILABLE");
    }
}
