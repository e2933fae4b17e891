//! Fixed-width record codec.
//!
//! A record is `bytes_per_record` bytes wide. Every column occupies
//! `field_length` bytes: a separator byte (the first column's separator is
//! the record's deletion flag) followed by the space-padded value.
//!
//! ```text
//! [0x20][name value.........][0x20][age]
//!  ^ deletion flag           ^ separator
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use crate::error::{DbfError, Result};
use crate::format::types::{ColumnDescriptor, NOT_DELETED_MARKER};

/// One table row, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    contents: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_name: &str) -> Option<&str> {
        self.contents.get(field_name).map(String::as_str)
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.contents.contains_key(field_name)
    }

    pub fn contents(&self) -> &BTreeMap<String, String> {
        &self.contents
    }

    pub fn into_contents(self) -> BTreeMap<String, String> {
        self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.contents.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Decode a record of `width` bytes laid out by `columns`.
    ///
    /// The deletion flag is skipped. Each column's window is clamped to the
    /// record width, so records written as `1 + Σ field_length` decode the
    /// same way as records written here.
    pub fn from_bytes(bytes: &[u8], width: usize, columns: &[ColumnDescriptor]) -> Result<Self> {
        if bytes.len() < width {
            return Err(DbfError::TruncatedInput {
                structure: "record",
                required: width as u64,
                actual: bytes.len() as u64,
            });
        }
        let data = &bytes[..width];

        let mut contents = BTreeMap::new();
        let mut pos = 1usize;
        for column in columns {
            let start = pos.min(width);
            let end = (pos + column.field_length as usize).min(width);
            contents.insert(column.field_name.clone(), decode_value(&data[start..end]));
            pos += column.field_length as usize;
        }
        Ok(Self { contents })
    }

    /// Encode the record as `Σ field_length` bytes in `columns` order.
    pub fn to_bytes(&self, columns: &[ColumnDescriptor]) -> Result<Vec<u8>> {
        let width: usize = columns.iter().map(|c| c.field_length as usize).sum();
        let mut buf = vec![b' '; width];

        let mut pos = 0usize;
        for column in columns {
            let value = self.contents.get(&column.field_name).ok_or_else(|| {
                DbfError::SchemaMismatch(format!(
                    "Cannot find column {} in record",
                    column.field_name
                ))
            })?;
            let value = value.as_bytes();
            if value.len() > column.capacity() {
                return Err(DbfError::ValueTooLong {
                    field: column.field_name.clone(),
                    limit: column.capacity(),
                    actual: value.len(),
                });
            }
            if column.field_length > 0 {
                buf[pos] = NOT_DELETED_MARKER;
                buf[pos + 1..pos + 1 + value.len()].copy_from_slice(value);
            }
            pos += column.field_length as usize;
        }
        Ok(buf)
    }

    /// Write the encoded record to writer (exactly `Σ field_length` bytes).
    pub fn write_to<W: Write>(&self, writer: &mut W, columns: &[ColumnDescriptor]) -> Result<()> {
        writer.write_all(&self.to_bytes(columns)?)?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            contents: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for Record {
    fn from(contents: BTreeMap<String, String>) -> Self {
        Self { contents }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.contents {
            writeln!(f, "\"{}\" = \"{}\"", k, v)?;
        }
        Ok(())
    }
}

/// Trim space and NUL padding from both ends of a stored value.
fn decode_value(raw: &[u8]) -> String {
    let is_pad = |b: &u8| *b == b' ' || *b == 0;
    let start = raw.iter().position(|b| !is_pad(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    String::from_utf8_lossy(&raw[start..end]).into_owned()
}
