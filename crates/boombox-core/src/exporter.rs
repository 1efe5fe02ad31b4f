//! CSV and JSON export of tables

use crate::error::{Error, Result};
use crate::table::CsvTable;
use chrono::{Local, NaiveDate};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Prefix of every default export file name
pub const FILE_PREFIX: &str = "BoomBox";

/// Which kind of export a default file name is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Full merge of the pending files
    Merged,
    /// Filtered view of a preview session
    Filtered,
}

/// Default file name for an export made on `date`
///
/// `BoomBox-20240131.csv` for a merge, `BoomBox-20240131-filtrado.csv` for a
/// filtered view.
pub fn default_file_name(kind: ExportKind, date: NaiveDate) -> String {
    let stamp = date.format("%Y%m%d");
    match kind {
        ExportKind::Merged => format!("{}-{}.csv", FILE_PREFIX, stamp),
        ExportKind::Filtered => format!("{}-{}-filtrado.csv", FILE_PREFIX, stamp),
    }
}

/// Default file name for an export made today, local time
pub fn today_file_name(kind: ExportKind) -> String {
    default_file_name(kind, Local::now().date_naive())
}

/// Write `table` as CSV to any writer
///
/// Header first, then one record per row. Cells are written verbatim and
/// quoted only when they contain a comma, quote or line break. Returns the
/// number of data rows written.
pub fn export_csv<W: Write>(table: &CsvTable, writer: W) -> std::result::Result<usize, csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(&table.columns)?;
    for row in &table.rows {
        csv_writer.write_record(&row.cells)?;
    }
    csv_writer.flush()?;

    Ok(table.row_count())
}

/// Write `table` as pretty JSON (`columns` and `rows`) to any writer
pub fn export_json<W: Write>(table: &CsvTable, writer: W) -> Result<usize> {
    serde_json::to_writer_pretty(writer, table)?;
    Ok(table.row_count())
}

/// Write `table` as a UTF-8 CSV file at `path`
pub fn export_to_path<P: AsRef<Path>>(table: &CsvTable, path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    let count = export_csv(table, BufWriter::new(file)).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    tracing::info!(path = %path.display(), rows = count, "Exported CSV");
    Ok(count)
}

/// Write `table` as a JSON file at `path`
pub fn export_json_to_path<P: AsRef<Path>>(table: &CsvTable, path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut writer = BufWriter::new(file);
    let count = export_json(table, &mut writer)?;
    writer.flush().map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), rows = count, "Exported JSON");
    Ok(count)
}
