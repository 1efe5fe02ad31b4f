//! Merge engine for combining CSV exports into one time-ordered table

use crate::error::{Error, Result};
use crate::parser::parse_csv;
use crate::table::{CsvTable, Row};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Column stripped from every input before merging
pub const ID_COLUMN: &str = "ID";

/// Column that drives sort order and duplicate highlighting
pub const TIME_COLUMN: &str = "Time";

/// Layout of the date and time part of a "Time" cell
const TIME_BASE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Direction of the "Time" sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    /// Most recent first
    #[default]
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort order '{}', expected asc or desc",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "asc"),
            SortOrder::Descending => write!(f, "desc"),
        }
    }
}

/// Parse a "Time" cell in `YYYY-MM-DD HH:MM:SS.ffffff` form
///
/// The fraction is required and holds 1 to 6 digits. Anything else,
/// including surrounding text, yields `None`.
pub fn parse_time(text: &str) -> Option<NaiveDateTime> {
    let (base, fraction) = text.split_once('.')?;
    if fraction.is_empty() || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    if !has_base_shape(base) {
        return None;
    }

    let base = NaiveDateTime::parse_from_str(base, TIME_BASE_FORMAT).ok()?;
    let micros: u32 = format!("{:0<6}", fraction).parse().ok()?;
    base.with_nanosecond(micros * 1_000)
}

/// Fixed-width `YYYY-MM-DD HH:MM:SS` check, seconds 00-59
///
/// chrono alone tolerates padding differences and leap seconds.
fn has_base_shape(base: &str) -> bool {
    let bytes = base.as_bytes();
    if bytes.len() != 19 {
        return false;
    }

    let separators_ok = bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b' ',
        13 | 16 => b == b':',
        _ => b.is_ascii_digit(),
    });

    separators_ok && bytes[17] <= b'5'
}

/// Load every file in `paths` and merge them
///
/// Files are read in order and the first failure aborts the merge.
pub fn merge_files<P: AsRef<Path>>(paths: &[P], order: SortOrder) -> Result<CsvTable> {
    if paths.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        tables.push(parse_csv(path)?);
    }

    merge_tables(tables, order)
}

/// Merge already loaded tables
///
/// The "ID" column is dropped from each table, the first table's columns
/// become canonical and every other table is aligned to them, rows are
/// concatenated in table order, and the result is sorted by "Time" when that
/// column exists.
pub fn merge_tables(tables: Vec<CsvTable>, order: SortOrder) -> Result<CsvTable> {
    if tables.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut merged: Option<CsvTable> = None;

    for mut table in tables {
        table.remove_column(ID_COLUMN);

        match merged.as_mut() {
            None => {
                if table.columns.is_empty() {
                    return Err(Error::CsvParse {
                        path: table.sources.first().cloned().unwrap_or_default(),
                        message: format!("no columns after removing {}", ID_COLUMN),
                    });
                }
                tracing::debug!(columns = ?table.columns, "Canonical columns");
                merged = Some(table);
            }
            Some(acc) => {
                let dropped: Vec<&String> = table
                    .columns
                    .iter()
                    .filter(|c| !acc.has_column(c))
                    .collect();
                if !dropped.is_empty() {
                    tracing::info!(
                        sources = ?table.sources,
                        dropped = ?dropped,
                        "Columns not present in the first file are discarded"
                    );
                }

                let aligned = table.reindex(&acc.columns);
                acc.rows.extend(aligned.rows);
                acc.sources.extend(aligned.sources);
            }
        }
    }

    let mut merged = merged.ok_or(Error::EmptyInput)?;

    if merged.has_column(TIME_COLUMN) {
        let unparsed = sort_by_time(&mut merged, order);
        if unparsed > 0 {
            tracing::warn!(
                count = unparsed,
                "Time values not in YYYY-MM-DD HH:MM:SS.ffffff form were placed last"
            );
        }
    }

    tracing::info!(
        files = merged.sources.len(),
        rows = merged.row_count(),
        columns = merged.column_count(),
        %order,
        "Merge complete"
    );

    Ok(merged)
}

/// Stable sort of `table` by its parsed "Time" column
///
/// Rows whose time does not parse go after all others in either direction,
/// in their existing order. Cell text is never rewritten. Returns the number
/// of rows without a parseable time; a table without the column is left
/// untouched.
pub fn sort_by_time(table: &mut CsvTable, order: SortOrder) -> usize {
    let Some(col) = table.column_index(TIME_COLUMN) else {
        return 0;
    };

    let mut keyed: Vec<(Option<NaiveDateTime>, Row)> = table
        .rows
        .drain(..)
        .map(|row| (row.get(col).and_then(parse_time), row))
        .collect();

    let unparsed = keyed.iter().filter(|(key, _)| key.is_none()).count();

    keyed.sort_by(|(a, _), (b, _)| compare_keys(a.as_ref(), b.as_ref(), order));
    table.rows = keyed.into_iter().map(|(_, row)| row).collect();

    unparsed
}

fn compare_keys(a: Option<&NaiveDateTime>, b: Option<&NaiveDateTime>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => a.cmp(b),
            SortOrder::Descending => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;
    use chrono::NaiveDate;

    fn times(table: &CsvTable) -> Vec<&str> {
        (0..table.row_count())
            .map(|i| table.get(i, TIME_COLUMN).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_time() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_micro_opt(14, 7, 9, 123456)
            .unwrap();
        assert_eq!(parse_time("2024-03-05 14:07:09.123456"), Some(expected));
    }

    #[test]
    fn test_parse_time_short_fraction() {
        let parsed = parse_time("2024-03-05 14:07:09.5").unwrap();
        assert_eq!(parsed.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_time_rejects_other_forms() {
        assert_eq!(parse_time("2024-03-05 14:07:09"), None);
        assert_eq!(parse_time("2024-03-05 14:07:09."), None);
        assert_eq!(parse_time("2024-03-05 14:07:09.1234567"), None);
        assert_eq!(parse_time("2024-03-05T14:07:09.000000"), None);
        assert_eq!(parse_time("2024-13-05 14:07:09.000000"), None);
        assert_eq!(parse_time(" 2024-03-05 14:07:09.5"), None);
        assert_eq!(parse_time("2024-03-05  14:07:09.5"), None);
        assert_eq!(parse_time("2024-03-05 14:07:09.5 "), None);
        assert_eq!(parse_time("2024-3-5 1:0:0.5"), None);
        assert_eq!(parse_time("2024-06-30 23:59:60.5"), None);
        assert_eq!(parse_time("not a time"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!(
            "descending".parse::<SortOrder>().unwrap(),
            SortOrder::Descending
        );
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Descending);
    }

    #[test]
    fn test_merge_empty_input() {
        let err = merge_tables(Vec::new(), SortOrder::Descending).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));

        let none: [&str; 0] = [];
        let err = merge_files(&none, SortOrder::Ascending).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn test_merge_aligns_to_first_file() {
        let a = parse_csv_str(
            "ID,Time,Val\n1,2024-01-01 10:00:00.000000,a1\n2,2024-01-03 10:00:00.000000,a2\n",
            "a.csv",
        )
        .unwrap();
        let b = parse_csv_str(
            "Time,Val,Extra\n2024-01-02 10:00:00.000000,b1,x\n",
            "b.csv",
        )
        .unwrap();

        let merged = merge_tables(vec![a, b], SortOrder::Descending).unwrap();

        assert_eq!(merged.columns, vec!["Time", "Val"]);
        assert_eq!(merged.row_count(), 3);
        assert_eq!(
            times(&merged),
            vec![
                "2024-01-03 10:00:00.000000",
                "2024-01-02 10:00:00.000000",
                "2024-01-01 10:00:00.000000",
            ]
        );
        assert_eq!(merged.get(0, "Val"), Some("a2"));
        assert_eq!(merged.get(1, "Val"), Some("b1"));
    }

    #[test]
    fn test_first_file_with_only_id_is_rejected() {
        let a = parse_csv_str("ID\n1\n2\n", "a.csv").unwrap();
        let b = parse_csv_str("Time,Val\n2024-01-01 10:00:00.0,x\n", "b.csv").unwrap();

        let err = merge_tables(vec![a, b], SortOrder::Descending).unwrap_err();
        assert!(err.is_load_error());
        assert!(err.to_string().contains("no columns after removing ID"));
    }

    #[test]
    fn test_later_file_with_only_id_is_padded() {
        let a = parse_csv_str("Val\nx\n", "a.csv").unwrap();
        let b = parse_csv_str("ID\n7\n", "b.csv").unwrap();

        let merged = merge_tables(vec![a, b], SortOrder::Descending).unwrap();
        assert_eq!(merged.columns, vec!["Val"]);
        assert_eq!(merged.rows[1].cells, vec![""]);
    }

    #[test]
    fn test_missing_canonical_columns_are_padded() {
        let a = parse_csv_str("Val,Note\nx,first\n", "a.csv").unwrap();
        let b = parse_csv_str("Val\ny\n", "b.csv").unwrap();

        let merged = merge_tables(vec![a, b], SortOrder::Ascending).unwrap();

        assert_eq!(merged.rows[1].cells, vec!["y", ""]);
    }

    #[test]
    fn test_no_time_column_keeps_file_order() {
        let a = parse_csv_str("Val\n3\n1\n", "a.csv").unwrap();
        let b = parse_csv_str("Val\n2\n", "b.csv").unwrap();

        let merged = merge_tables(vec![a, b], SortOrder::Descending).unwrap();

        let vals: Vec<_> = merged.rows.iter().map(|r| r.cells[0].as_str()).collect();
        assert_eq!(vals, vec!["3", "1", "2"]);
        assert_eq!(merged.sources.len(), 2);
    }

    #[test]
    fn test_sort_is_stable_for_equal_times() {
        let a = parse_csv_str(
            "Time,Val\n2024-01-01 10:00:00.000000,a1\n2024-01-01 10:00:00.000000,a2\n",
            "a.csv",
        )
        .unwrap();
        let b = parse_csv_str("Time,Val\n2024-01-01 10:00:00.000000,b1\n", "b.csv").unwrap();

        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let merged = merge_tables(vec![a.clone(), b.clone()], order).unwrap();
            let vals: Vec<_> = merged.rows.iter().map(|r| r.cells[1].as_str()).collect();
            assert_eq!(vals, vec!["a1", "a2", "b1"], "order {}", order);
        }
    }

    #[test]
    fn test_unparseable_times_sort_last() {
        let csv = "Time,Val\n\
                   garbage,g\n\
                   2024-01-01 10:00:00.000000,old\n\
                   ,blank\n\
                   2024-01-02 10:00:00.000000,new\n";
        let table = parse_csv_str(csv, "a.csv").unwrap();

        let asc = merge_tables(vec![table.clone()], SortOrder::Ascending).unwrap();
        let vals: Vec<_> = asc.rows.iter().map(|r| r.cells[1].as_str()).collect();
        assert_eq!(vals, vec!["old", "new", "g", "blank"]);

        let desc = merge_tables(vec![table], SortOrder::Descending).unwrap();
        let vals: Vec<_> = desc.rows.iter().map(|r| r.cells[1].as_str()).collect();
        assert_eq!(vals, vec!["new", "old", "g", "blank"]);
    }

    #[test]
    fn test_loosely_formatted_times_sort_last() {
        let csv = "Time,Val\n\
                   2024-1-1 1:0:0.5,loose\n\
                   2024-01-01 10:00:00.0,early\n\
                   2024-06-30 23:59:60.5,leap\n\
                   2024-01-02 10:00:00.0,late\n";
        let table = parse_csv_str(csv, "a.csv").unwrap();

        let merged = merge_tables(vec![table], SortOrder::Ascending).unwrap();
        let vals: Vec<_> = merged.rows.iter().map(|r| r.cells[1].as_str()).collect();
        assert_eq!(vals, vec!["early", "late", "loose", "leap"]);
    }

    #[test]
    fn test_time_text_is_preserved() {
        let csv = "Time,Val\n2024-01-02 10:00:00.5,short\n2024-01-01 09:00:00.000001,long\n";
        let table = parse_csv_str(csv, "a.csv").unwrap();

        let merged = merge_tables(vec![table], SortOrder::Ascending).unwrap();

        assert_eq!(
            times(&merged),
            vec!["2024-01-01 09:00:00.000001", "2024-01-02 10:00:00.5"]
        );
    }

    #[test]
    fn test_sort_by_time_counts_unparsed() {
        let mut table =
            parse_csv_str("Time\n2024-01-01 10:00:00.0\nbad\nworse\n", "a.csv").unwrap();
        assert_eq!(sort_by_time(&mut table, SortOrder::Descending), 2);

        let mut no_time = parse_csv_str("Val\n1\n", "b.csv").unwrap();
        assert_eq!(sort_by_time(&mut no_time, SortOrder::Descending), 0);
    }
}
