//! Delimited export
//!
//! Writes a result table as semicolon-separated text: one column per series in
//! fixed category order, one line per index up to the longest series. Shorter
//! series leave their trailing cells empty.
//!
//! Cells are written as they are, never quoted. A response time that itself
//! contains `;` therefore splits into extra cells when read back.

use crate::error::ExtractError;
use crate::types::ResultTable;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Field separator of exported files
pub const DELIMITER: u8 = b';';

/// Write `table` to `writer`
pub fn write_results<W: Write>(writer: W, table: &ResultTable) -> Result<(), ExtractError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    writer.write_record(table.iter().map(|(category, _)| category.label()))?;

    for index in 0..table.max_len() {
        let line: Vec<String> = table
            .iter()
            .map(|(_, values)| values.get(index).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&line)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `table` to a file, replacing any previous content
pub fn export_results(path: impl AsRef<Path>, table: &ResultTable) -> Result<(), ExtractError> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "exporting results");
    let file = File::create(path)?;
    write_results(BufWriter::new(file), table)
}

/// Read an exported file back into `(series name, values)` columns.
///
/// Empty cells are padding and are dropped.
pub fn read_exported<R: Read>(reader: R) -> Result<Vec<(String, Vec<String>)>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut columns: Vec<(String, Vec<String>)> = reader
        .headers()?
        .iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();

    for record in reader.records() {
        let record = record?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            if !cell.is_empty() {
                column.1.push(cell.to_string());
            }
        }
    }

    Ok(columns)
}
