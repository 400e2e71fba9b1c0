//! Result table rendering
//!
//! Writes the table as delimited records (header first) or as JSON.

use std::io::Write;

use clap::ValueEnum;
use ldap_batch::ResultTable;

use crate::error::{CliError, CliResult};

/// Output format for the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One delimited record per row, header first
    #[default]
    Csv,
    /// The table as a JSON document, including failed identifiers
    Json,
}

/// Write `table` to `writer` in the given format.
pub fn write_table<W: Write>(
    writer: W,
    table: &ResultTable,
    format: OutputFormat,
    separator: char,
) -> CliResult<()> {
    match format {
        OutputFormat::Csv => write_delimited(writer, table, separator),
        OutputFormat::Json => write_json(writer, table),
    }
}

fn write_delimited<W: Write>(writer: W, table: &ResultTable, separator: char) -> CliResult<()> {
    let delimiter = u8::try_from(separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CliError::Output(format!("separator must be a single ASCII character, got {separator:?}")))?;

    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for row in table.iter() {
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

fn write_json<W: Write>(mut writer: W, table: &ResultTable) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut writer, table)?;
    writeln!(writer)?;
    Ok(())
}
