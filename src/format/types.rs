//! DBF format types and constants.
//!
//! Defines the binary layout of the table header and column descriptors,
//! and the offset arithmetic shared by the reader and the writer.

use std::fmt;
use std::io::Write;

use chrono::{Datelike, Local};

use crate::error::{DbfError, Result};

// ── Constants ──────────────────────────────────────────────────────

/// Table header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Column descriptor size in bytes.
pub const DESCRIPTOR_SIZE: usize = 32;

/// Table type marker written at header byte 0.
pub const TABLE_TYPE_MARKER: u8 = 0x03;

/// Byte following the last column descriptor.
pub const DESCRIPTOR_TERMINATOR: u8 = 0x0D;

/// Byte appended at the end of the table data.
pub const END_OF_FILE_MARKER: u8 = 0x1A;

/// Deletion flag value for a live record.
pub const NOT_DELETED_MARKER: u8 = 0x20;

/// Field type marker for fixed-width text ('C'). The only supported type.
pub const FIELD_TYPE_TEXT: u8 = b'C';

/// Maximum field name length in bytes.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Largest stored field length (one byte on disk).
pub const MAX_FIELD_LENGTH: usize = u8::MAX as usize;

// ── Offset Helpers ─────────────────────────────────────────────────

/// Size of header + descriptors + terminator for `columns` columns.
/// This is the value stored in `Header::header_total_bytes`.
pub fn header_total_bytes(columns: usize) -> usize {
    HEADER_SIZE + columns * DESCRIPTOR_SIZE + 1
}

/// Number of column descriptors implied by a header's `header_total_bytes`.
pub fn columns_count(header_total_bytes: u16) -> usize {
    (header_total_bytes as usize).saturating_sub(HEADER_SIZE + 1) / DESCRIPTOR_SIZE
}

/// Absolute offset of column descriptor `index`.
pub fn descriptor_offset(index: usize) -> u64 {
    (HEADER_SIZE + index * DESCRIPTOR_SIZE) as u64
}

/// Absolute offset of the descriptor terminator byte.
pub fn terminator_offset(columns: usize) -> u64 {
    (HEADER_SIZE + columns * DESCRIPTOR_SIZE) as u64
}

/// Absolute offset of record `index`.
pub fn record_offset(columns: usize, bytes_per_record: u16, index: usize) -> u64 {
    header_total_bytes(columns) as u64 + index as u64 * bytes_per_record as u64
}

// ── Packed Date ────────────────────────────────────────────────────

/// Last-update date packed into three bytes: years since 1900, month, day.
///
/// Stored exactly as read; no calendar validation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PackedDate(u32);

impl PackedDate {
    pub fn new(year_offset: u8, month: u8, day: u8) -> Self {
        Self::from_bytes([year_offset, month, day])
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16)
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [
            (self.0 & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            ((self.0 >> 16) & 0xFF) as u8,
        ]
    }

    /// Today's local date, month 1-based.
    pub fn today() -> Self {
        let now = Local::now();
        let year_offset = (now.year() - 1900).clamp(0, u8::MAX as i32) as u8;
        Self::new(year_offset, now.month() as u8, now.day() as u8)
    }

    /// The packed integer, `year | month << 8 | day << 16`.
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn year_offset(self) -> u8 {
        self.to_bytes()[0]
    }

    pub fn month(self) -> u8 {
        self.to_bytes()[1]
    }

    pub fn day(self) -> u8 {
        self.to_bytes()[2]
    }
}

impl fmt::Display for PackedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.year_offset() as u32 + 1900,
            self.month(),
            self.day()
        )
    }
}

// ── Header ─────────────────────────────────────────────────────────

/// Table header, exactly 32 bytes on disk.
///
/// ```text
/// Offset  Size  Field
/// 0       1     table type marker: 0x03
/// 1       3     last_updated: years since 1900, month, day
/// 4       4     records_cnt: u32
/// 8       2     header_total_bytes: u16 (offset of the first record)
/// 10      2     bytes_per_record: u16
/// 12      20    reserved: 0x00
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub last_updated: PackedDate,
    pub records_cnt: u32,
    pub header_total_bytes: u16,
    pub bytes_per_record: u16,
}

impl Header {
    /// Compute the header describing `columns` and `record_count` records.
    pub fn derive(
        columns: &[ColumnDescriptor],
        record_count: usize,
        last_updated: PackedDate,
    ) -> Result<Self> {
        let records_cnt = u32::try_from(record_count).map_err(|_| {
            DbfError::LayoutOverflow(format!("{} records exceed u32 range", record_count))
        })?;

        let total = header_total_bytes(columns.len());
        let header_total_bytes = u16::try_from(total).map_err(|_| {
            DbfError::LayoutOverflow(format!(
                "{} columns need a {}-byte header, max is {}",
                columns.len(),
                total,
                u16::MAX
            ))
        })?;

        let width: usize = columns.iter().map(|c| c.field_length as usize).sum();
        let bytes_per_record = u16::try_from(width).map_err(|_| {
            DbfError::LayoutOverflow(format!(
                "record width {} exceeds max {}",
                width,
                u16::MAX
            ))
        })?;

        Ok(Self {
            last_updated,
            records_cnt,
            header_total_bytes,
            bytes_per_record,
        })
    }

    /// Parse header from byte slice (>= HEADER_SIZE bytes). Reserved bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DbfError::TruncatedInput {
                structure: "header",
                required: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }
        Ok(Self {
            last_updated: PackedDate::from_bytes([bytes[1], bytes[2], bytes[3]]),
            records_cnt: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            header_total_bytes: u16::from_le_bytes([bytes[8], bytes[9]]),
            bytes_per_record: u16::from_le_bytes([bytes[10], bytes[11]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = TABLE_TYPE_MARKER;
        buf[1..4].copy_from_slice(&self.last_updated.to_bytes());
        buf[4..8].copy_from_slice(&self.records_cnt.to_le_bytes());
        buf[8..10].copy_from_slice(&self.header_total_bytes.to_le_bytes());
        buf[10..12].copy_from_slice(&self.bytes_per_record.to_le_bytes());
        buf
    }

    /// Write header to writer (exactly HEADER_SIZE bytes).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Number of column descriptors this header accounts for.
    pub fn columns_count(&self) -> usize {
        columns_count(self.header_total_bytes)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Header length:\t\t\t\t{} bytes", self.header_total_bytes)?;
        writeln!(f, "Last updated:\t\t\t\t{}", self.last_updated)?;
        writeln!(f, "Number of records:\t\t\t{}", self.records_cnt)?;
        writeln!(f, "Number of bytes in header:\t\t{}", self.header_total_bytes)?;
        writeln!(f, "Number of bytes per record:\t\t{}", self.bytes_per_record)
    }
}

// ── Column Descriptor ──────────────────────────────────────────────

/// Column descriptor, exactly 32 bytes on disk.
///
/// ```text
/// Offset  Size  Field
/// 0       10    field_name: NUL-padded
/// 10      1     0x00
/// 11      1     field_type: 'C'
/// 12      4     reserved: 0x00
/// 16      1     field_length: u8 (separator byte + value capacity)
/// 17      15    reserved: 0x00
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub field_name: String,
    pub field_type: u8,
    pub field_length: u8,
}

impl ColumnDescriptor {
    /// A text column with the given stored length.
    pub fn text(field_name: impl Into<String>, field_length: u8) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: FIELD_TYPE_TEXT,
            field_length,
        }
    }

    /// Usable bytes for a value in this column.
    pub fn capacity(&self) -> usize {
        (self.field_length as usize).saturating_sub(1)
    }

    /// Parse a descriptor from byte slice (>= DESCRIPTOR_SIZE bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DESCRIPTOR_SIZE {
            return Err(DbfError::TruncatedInput {
                structure: "column descriptor",
                required: DESCRIPTOR_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }
        let raw_name = &bytes[..MAX_FIELD_NAME_LEN];
        let name_end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let field_name = String::from_utf8_lossy(&raw_name[..name_end])
            .trim_matches(' ')
            .to_string();

        Ok(Self {
            field_name,
            field_type: bytes[11],
            field_length: bytes[16],
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; DESCRIPTOR_SIZE]> {
        let name = self.field_name.as_bytes();
        if name.len() > MAX_FIELD_NAME_LEN {
            return Err(DbfError::FieldNameTooLong {
                name: self.field_name.clone(),
                len: name.len(),
            });
        }
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[..name.len()].copy_from_slice(name);
        buf[11] = self.field_type;
        buf[16] = self.field_length;
        Ok(buf)
    }

    /// Write descriptor to writer (exactly DESCRIPTOR_SIZE bytes).
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "field_name: \"{}\"", self.field_name)?;
        if self.field_type == FIELD_TYPE_TEXT {
            writeln!(f, "field_type: Characters")?;
        } else {
            writeln!(f, "field_type: {:?}", self.field_type as char)?;
        }
        writeln!(f, "field_length: {}", self.field_length)
    }
}
