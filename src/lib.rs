//! dbftools: read, build and write fixed-layout DBF tables.
//!
//! A [`Table`] is loaded by [`TableReader`], mutated only through
//! [`TableBuilder`] (which keeps the header derived from the columns and
//! records), and persisted by [`TableWriter`].

pub mod builder;
pub mod error;
pub mod format;
pub mod schema;
pub mod table;

pub use builder::TableBuilder;
pub use error::{DbfError, Result};
pub use format::{ColumnDescriptor, Header, PackedDate, Record, TableReader, TableWriter};
pub use schema::{ColumnSpec, TableSchema};
pub use table::Table;
