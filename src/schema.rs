//! JSON table schema.
//!
//! Describes a table layout (and optionally its rows) for the command-line
//! tool and for callers that keep column lists in configuration files:
//!
//! ```text
//! {
//!   "columns": [{ "name": "STOCK_CODE", "width": 6 }, { "name": "QTY", "width": 10 }],
//!   "rows": [{ "STOCK_CODE": "600000", "QTY": "100" }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::TableBuilder;
use crate::error::Result;
use crate::table::Table;

/// One column: name and value capacity in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub width: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<BTreeMap<String, String>>,
}

impl TableSchema {
    /// Read a schema from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&contents)?;
        Ok(schema)
    }

    /// Write the schema as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Describe an existing table. Widths are value capacities, so the schema
    /// rebuilds the same stored field lengths.
    pub fn from_table(table: &Table, include_rows: bool) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|c| ColumnSpec {
                name: c.field_name.clone(),
                width: c.capacity(),
            })
            .collect();
        let rows = if include_rows {
            table
                .records()
                .iter()
                .map(|r| r.contents().clone())
                .collect()
        } else {
            Vec::new()
        };
        Self { columns, rows }
    }

    /// Build a table from the schema, validating every row.
    pub fn build(&self) -> Result<Table> {
        let mut table = Table::new();
        let mut builder = TableBuilder::new(&mut table);
        builder.set_columns(self.columns.iter().map(|c| (c.name.as_str(), c.width)))?;
        for row in &self.rows {
            builder.append_record(row.clone())?;
        }
        Ok(table)
    }
}

/// Read a JSON array of rows (`[{"field": "value"}, ...]`).
pub fn read_rows(path: &Path) -> Result<Vec<BTreeMap<String, String>>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
