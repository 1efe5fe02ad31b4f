//! CSV loader for BoomBox exports
//!
//! Every cell is kept as raw text: no trimming and no type detection.

use crate::error::{Error, Result};
use crate::table::CsvTable;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Parse a CSV file into a table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<CsvTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table = parse_reader(BufReader::new(file), path.to_path_buf())?;
    tracing::debug!(
        path = %path.display(),
        columns = table.column_count(),
        rows = table.row_count(),
        "Loaded CSV"
    );
    Ok(table)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<CsvTable> {
    parse_reader(content.as_bytes(), PathBuf::from(source_name))
}

fn parse_reader<R: Read>(reader: R, path: PathBuf) -> Result<CsvTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Short rows are padded below
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.clone(),
        source: e,
    })?;

    if headers.is_empty() {
        return Err(Error::CsvParse {
            path,
            message: "no columns found in CSV".to_string(),
        });
    }

    let columns = unique_column_names(headers.iter());
    let mut table = CsvTable::new(columns);

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        if record.len() > table.column_count() {
            return Err(Error::CsvParse {
                path,
                message: format!(
                    "row {} has {} fields, expected {}",
                    row_idx + 1,
                    record.len(),
                    table.column_count()
                ),
            });
        }

        table.push_row(record.iter().map(str::to_string).collect());
    }

    table.sources.push(path);
    Ok(table)
}

/// Normalise header names so every column name is unique
///
/// A leading byte-order mark is dropped, and repeated names get `.1`, `.2`,
/// ... appended to their later occurrences.
fn unique_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::new();

    for (i, raw) in headers.enumerate() {
        let name = if i == 0 {
            raw.trim_start_matches('\u{feff}')
        } else {
            raw
        };

        let mut candidate = name.to_string();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", name, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        columns.push(candidate);
    }

    columns
}
