//! Preview session: filtering, duplicate highlighting and row deletion
//!
//! A session owns the merged table (`original`) and a filtered copy that is
//! rebuilt on every change. Positions handed to and returned from the session
//! are 1-based row numbers of the filtered view, matching the "N°" column a
//! UI shows.

use crate::error::{Error, Result};
use crate::exporter::export_to_path;
use crate::merger::TIME_COLUMN;
use crate::table::CsvTable;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Interactive view over a merged table
#[derive(Debug, Clone)]
pub struct PreviewSession {
    original: CsvTable,
    filtered: CsvTable,
    filter: String,
    /// For each filtered row, its index in `original`
    visible: Vec<usize>,
    duplicates: BTreeSet<usize>,
}

impl PreviewSession {
    /// Open a session showing every row of `table`
    pub fn new(table: CsvTable) -> Self {
        let mut session = Self {
            filtered: CsvTable::new(table.columns.clone()),
            original: table,
            filter: String::new(),
            visible: Vec::new(),
            duplicates: BTreeSet::new(),
        };
        session.refresh();
        session
    }

    /// The full table, minus deleted rows
    pub fn original(&self) -> &CsvTable {
        &self.original
    }

    /// The rows matching the current filter
    pub fn filtered(&self) -> &CsvTable {
        &self.filtered
    }

    /// Current filter text
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Keep only rows with a cell containing `text`, ignoring case
    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.refresh();
    }

    /// Show every row again
    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    /// Delete the rows shown at `positions` from the original table
    ///
    /// All positions are resolved against the view as it is before the
    /// deletion. Unknown positions are ignored. Returns the number of rows
    /// removed.
    pub fn delete_rows(&mut self, positions: &BTreeSet<usize>) -> usize {
        if positions.is_empty() || self.original.is_empty() {
            return 0;
        }

        let doomed: BTreeSet<usize> = positions
            .iter()
            .filter_map(|&pos| pos.checked_sub(1).and_then(|i| self.visible.get(i)).copied())
            .collect();

        if doomed.is_empty() {
            return 0;
        }

        let before = self.original.row_count();
        let mut index = 0;
        self.original.rows.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
        let removed = before - self.original.row_count();

        tracing::info!(
            removed,
            remaining = self.original.row_count(),
            "Deleted rows from preview"
        );

        self.refresh();
        removed
    }

    /// Positions of filtered rows whose "Time" text appears more than once
    /// in the filtered view
    pub fn duplicate_time_mask(&self) -> &BTreeSet<usize> {
        &self.duplicates
    }

    /// True if the row at `position` should be highlighted as a duplicate
    pub fn is_duplicate(&self, position: usize) -> bool {
        self.duplicates.contains(&position)
    }

    /// Number of rows in the filtered view
    pub fn visible_count(&self) -> usize {
        self.filtered.row_count()
    }

    /// Number of rows in the original table
    pub fn total_count(&self) -> usize {
        self.original.row_count()
    }

    /// Row count summary for display
    pub fn status_line(&self) -> String {
        format!(
            "Showing {} of {} rows",
            self.visible_count(),
            self.total_count()
        )
    }

    /// Text of one displayed cell
    pub fn cell_text(&self, position: usize, column: &str) -> Result<&str> {
        let row = position
            .checked_sub(1)
            .filter(|&i| i < self.filtered.row_count())
            .ok_or_else(|| {
                Error::InvalidSelection(format!(
                    "row {} is not in the current view ({} rows)",
                    position,
                    self.visible_count()
                ))
            })?;

        self.filtered
            .get(row, column)
            .ok_or_else(|| Error::InvalidSelection(format!("column '{}' not found", column)))
    }

    /// Write the filtered view to `path`
    ///
    /// Fails with [`Error::NothingToExport`] when no rows are visible.
    pub fn export_filtered<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        if self.filtered.is_empty() {
            return Err(Error::NothingToExport);
        }
        export_to_path(&self.filtered, path)
    }

    fn refresh(&mut self) {
        let needle = self.filter.to_lowercase();

        self.visible = if needle.is_empty() {
            (0..self.original.row_count()).collect()
        } else {
            self.original
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.contains_ignore_case(&needle))
                .map(|(i, _)| i)
                .collect()
        };

        self.filtered = self.original.select_rows(&self.visible);
        self.duplicates = duplicate_positions(&self.filtered, TIME_COLUMN);

        tracing::debug!(
            filter = %self.filter,
            visible = self.visible.len(),
            duplicates = self.duplicates.len(),
            "Preview refreshed"
        );
    }
}

/// 1-based positions of rows whose `column` text is shared with another row
fn duplicate_positions(table: &CsvTable, column: &str) -> BTreeSet<usize> {
    let Some(col) = table.column_index(column) else {
        return BTreeSet::new();
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &table.rows {
        if let Some(value) = row.get(col) {
            *counts.entry(value).or_default() += 1;
        }
    }

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(col).is_some_and(|v| counts[v] > 1))
        .map(|(i, _)| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn session() -> PreviewSession {
        let csv = "Time,Val\n\
                   2024-01-05 10:00:00.000000,alpha\n\
                   2024-01-04 10:00:00.000000,Beta\n\
                   2024-01-04 10:00:00.000000,gamma\n\
                   2024-01-02 10:00:00.000000,ALPHA two\n\
                   2024-01-01 10:00:00.000000,delta\n";
        PreviewSession::new(parse_csv_str(csv, "merged.csv").unwrap())
    }

    fn vals(table: &CsvTable) -> Vec<&str> {
        (0..table.row_count())
            .map(|i| table.get(i, "Val").unwrap())
            .collect()
    }

    fn set(positions: &[usize]) -> BTreeSet<usize> {
        positions.iter().copied().collect()
    }

    #[test]
    fn test_new_session_shows_everything() {
        let s = session();
        assert_eq!(s.filtered(), s.original());
        assert_eq!(s.status_line(), "Showing 5 of 5 rows");
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let mut s = session();
        s.set_filter("Alpha");
        assert_eq!(vals(s.filtered()), vec!["alpha", "ALPHA two"]);
        assert_eq!(s.status_line(), "Showing 2 of 5 rows");
    }

    #[test]
    fn test_filter_matches_any_column() {
        let mut s = session();
        s.set_filter("01-04");
        assert_eq!(vals(s.filtered()), vec!["Beta", "gamma"]);
    }

    #[test]
    fn test_filter_is_idempotent_and_clearable() {
        let mut s = session();
        s.set_filter("a");
        let once = s.filtered().clone();
        s.set_filter("a");
        assert_eq!(s.filtered(), &once);

        s.clear_filter();
        assert_eq!(s.filter(), "");
        assert_eq!(s.filtered(), s.original());
    }

    #[test]
    fn test_filter_without_matches() {
        let mut s = session();
        s.set_filter("zzz");
        assert_eq!(s.visible_count(), 0);
        assert!(s.duplicate_time_mask().is_empty());
    }

    #[test]
    fn test_duplicate_mask_on_full_view() {
        let s = session();
        assert_eq!(s.duplicate_time_mask(), &set(&[2, 3]));
        assert!(s.is_duplicate(2));
        assert!(!s.is_duplicate(1));
    }

    #[test]
    fn test_duplicate_mask_follows_filter() {
        let mut s = session();
        s.set_filter("gamma");
        assert!(s.duplicate_time_mask().is_empty());

        s.set_filter("e");
        // Beta, delta
        assert_eq!(vals(s.filtered()), vec!["Beta", "delta"]);
        assert!(s.duplicate_time_mask().is_empty());

        s.set_filter("a");
        // alpha, Beta, gamma, ALPHA two, delta
        assert_eq!(s.duplicate_time_mask(), &set(&[2, 3]));
    }

    #[test]
    fn test_delete_from_unfiltered_view() {
        let mut s = session();
        let removed = s.delete_rows(&set(&[2, 4]));

        assert_eq!(removed, 2);
        assert_eq!(vals(s.original()), vec!["alpha", "gamma", "delta"]);
        assert_eq!(s.filtered(), s.original());
        assert!(s.duplicate_time_mask().is_empty());
    }

    #[test]
    fn test_delete_maps_filtered_positions_to_original_rows() {
        let mut s = session();
        s.set_filter("alpha");
        // view: 1 = alpha, 2 = ALPHA two
        let removed = s.delete_rows(&set(&[2]));

        assert_eq!(removed, 1);
        assert_eq!(vals(s.original()), vec!["alpha", "Beta", "gamma", "delta"]);
        assert_eq!(vals(s.filtered()), vec!["alpha"]);
        assert_eq!(s.filter(), "alpha");
    }

    #[test]
    fn test_delete_then_clear_filter_restores_remaining_rows() {
        let mut s = session();
        s.set_filter("a");
        s.delete_rows(&set(&[1]));
        s.clear_filter();

        assert_eq!(vals(s.filtered()), vec!["Beta", "gamma", "ALPHA two", "delta"]);
    }

    #[test]
    fn test_delete_ignores_out_of_range_and_empty() {
        let mut s = session();
        assert_eq!(s.delete_rows(&BTreeSet::new()), 0);
        assert_eq!(s.delete_rows(&set(&[0, 6, 100])), 0);
        assert_eq!(s.total_count(), 5);

        assert_eq!(s.delete_rows(&set(&[1, 99])), 1);
        assert_eq!(s.total_count(), 4);
    }

    #[test]
    fn test_delete_on_empty_table() {
        let mut s = PreviewSession::new(CsvTable::new(vec!["Time".into()]));
        assert_eq!(s.delete_rows(&set(&[1])), 0);
    }

    #[test]
    fn test_delete_everything() {
        let mut s = session();
        assert_eq!(s.delete_rows(&set(&[1, 2, 3, 4, 5])), 5);
        assert_eq!(s.status_line(), "Showing 0 of 0 rows");
    }

    #[test]
    fn test_no_time_column_has_no_duplicates() {
        let table = parse_csv_str("Val\nsame\nsame\n", "t.csv").unwrap();
        let s = PreviewSession::new(table);
        assert!(s.duplicate_time_mask().is_empty());
    }

    #[test]
    fn test_cell_text() {
        let mut s = session();
        s.set_filter("delta");
        assert_eq!(s.cell_text(1, "Val").unwrap(), "delta");
        assert_eq!(
            s.cell_text(1, "Time").unwrap(),
            "2024-01-01 10:00:00.000000"
        );
        assert!(matches!(
            s.cell_text(2, "Val"),
            Err(Error::InvalidSelection(_))
        ));
        assert!(matches!(
            s.cell_text(0, "Val"),
            Err(Error::InvalidSelection(_))
        ));
        assert!(matches!(
            s.cell_text(1, "Nope"),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_export_filtered_refuses_empty_view() {
        let mut s = session();
        s.set_filter("zzz");
        let err = s.export_filtered("unused.csv").unwrap_err();
        assert!(matches!(err, Error::NothingToExport));
    }
}
