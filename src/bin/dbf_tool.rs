//! dbf-tool: inspect, create and append to DBF tables.

use std::path::PathBuf;

use anyhow::{bail, Context};
use dbftools::schema::read_rows;
use dbftools::{TableBuilder, TableReader, TableSchema, TableWriter};

const USAGE: &str = "\
Usage: dbf-tool [--verbose] <command> <args>

Commands:
  dump <file.dbf>                  Print header, columns and records
  schema <file.dbf>                Print the column layout as schema JSON
  create <file.dbf> <schema.json>  Write a new table from a schema file
  append <file.dbf> <rows.json>    Append rows (JSON array of objects)

Flags:
  -V, --version  Print version information
  -h, --help     Print this help message
  --verbose      Log debug events to stderr";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("dbf-tool {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("dbf-tool {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("{}", USAGE);
        std::process::exit(0);
    }

    let verbose = args.iter().any(|a| a == "--verbose");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    if positional.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    if let Err(e) = run(&positional) {
        let code = e
            .downcast_ref::<dbftools::DbfError>()
            .map(|d| d.code())
            .unwrap_or("ERROR");
        eprintln!("Error [{}]: {:#}", code, e);
        std::process::exit(1);
    }
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    match args {
        ["dump", file] => {
            let table = TableReader::open(file)?.load_table()?;
            println!("{}", table);
        }
        ["schema", file] => {
            let table = TableReader::open(file)?.load_table()?;
            let schema = TableSchema::from_table(&table, false);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        ["create", file, schema_path] => {
            let schema = TableSchema::read_from(&PathBuf::from(schema_path))
                .with_context(|| format!("reading schema {}", schema_path))?;
            let table = schema.build()?;
            let mut writer = TableWriter::create(file)?;
            writer.dump_all(&table)?;
            writer.flush()?;
            tracing::info!(
                file = *file,
                columns = table.columns().len(),
                records = table.record_count(),
                "Created table"
            );
        }
        ["append", file, rows_path] => {
            let rows = read_rows(&PathBuf::from(rows_path))
                .with_context(|| format!("reading rows {}", rows_path))?;
            let mut table = TableReader::open(file)?.load_table()?;
            let old_count = table.record_count();

            let mut builder = TableBuilder::new(&mut table);
            for (i, row) in rows.into_iter().enumerate() {
                builder
                    .append_record(row)
                    .with_context(|| format!("row {} of {}", i, rows_path))?;
            }

            let new_count = table.record_count();
            let mut writer = TableWriter::open(file)?;
            writer.dump_part(&table, old_count, new_count)?;
            writer.flush()?;
            tracing::info!(file = *file, old_count, new_count, "Appended rows");
        }
        _ => bail!("unrecognized command\n\n{}", USAGE),
    }
    Ok(())
}
