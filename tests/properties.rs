//! Property tests: padding/trim idempotence, header derivation and
//! build -> dump -> load round trips over generated schemas.

use std::io::Cursor;

use dbftools::{ColumnDescriptor, Record, Table, TableBuilder, TableReader, TableWriter};
use proptest::collection::vec;
use proptest::prelude::*;

/// Column names: unique, 1..=10 bytes.
fn column_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[A-Z][A-Z0-9_]{0,9}", 1..8)
        .prop_map(|names| names.into_iter().collect())
}

/// Values without leading/trailing padding, at most `width` bytes.
fn value(width: usize) -> impl Strategy<Value = String> {
    let pattern = format!(
        "([A-Za-z0-9.]([A-Za-z0-9. ]{{0,{}}}[A-Za-z0-9.])?)?",
        width.saturating_sub(2)
    );
    proptest::string::string_regex(&pattern)
        .unwrap()
        .prop_filter("fits width", move |s| s.len() <= width)
}

fn schema_and_rows() -> impl Strategy<Value = (Vec<(String, usize)>, Vec<Vec<String>>)> {
    column_names()
        .prop_flat_map(|names| {
            let n = names.len();
            (Just(names), vec(1usize..40, n))
        })
        .prop_flat_map(|(names, widths)| {
            let row = widths.iter().map(|&w| value(w)).collect::<Vec<_>>();
            let columns: Vec<(String, usize)> = names.into_iter().zip(widths).collect();
            (Just(columns), vec(row, 0..20))
        })
}

fn build(columns: &[(String, usize)], rows: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    let mut builder = TableBuilder::new(&mut table);
    builder
        .set_columns(columns.iter().map(|(name, width)| (name.as_str(), *width)))
        .unwrap();
    for row in rows {
        let contents = columns
            .iter()
            .zip(row)
            .map(|((name, _), value)| (name.clone(), value.clone()));
        builder.append_record(contents).unwrap();
    }
    table
}

proptest! {
    #[test]
    fn padded_value_decodes_unchanged(width in 1usize..60, raw in "[a-z]{1,30}") {
        let v: String = raw.chars().take(width).collect();
        let column = ColumnDescriptor::text("F", (width + 1) as u8);
        let record: Record = [("F", v.as_str())].into_iter().collect();
        let bytes = record.to_bytes(std::slice::from_ref(&column)).unwrap();
        prop_assert_eq!(bytes.len(), width + 1);
        let decoded = Record::from_bytes(&bytes, bytes.len(), &[column]).unwrap();
        prop_assert_eq!(decoded.get("F"), Some(v.as_str()));
    }

    #[test]
    fn header_is_derived((columns, rows) in schema_and_rows()) {
        let table = build(&columns, &rows);
        let width: usize = columns.iter().map(|(_, w)| w + 1).sum();
        prop_assert_eq!(table.header().bytes_per_record as usize, width);
        prop_assert_eq!(table.header().header_total_bytes as usize, 32 + 32 * columns.len() + 1);
        prop_assert_eq!(table.header().records_cnt as usize, rows.len());
    }

    #[test]
    fn dump_load_roundtrip((columns, rows) in schema_and_rows()) {
        let table = build(&columns, &rows);

        let mut writer = TableWriter::new(Cursor::new(Vec::new()));
        writer.dump_all(&table).unwrap();
        let bytes = writer.into_inner().into_inner();

        let loaded = TableReader::new(Cursor::new(bytes)).load_table().unwrap();
        prop_assert_eq!(loaded, table);
    }
}
