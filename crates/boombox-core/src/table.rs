//! Core table types for representing CSV exports

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An in-memory table of string cells with named, ordered columns
///
/// Every row holds exactly one cell per column, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CsvTable {
    /// Column names, unique, in display order
    pub columns: Vec<String>,
    /// Row data
    pub rows: Vec<Row>,
    /// Files that contributed to this table, in load order; not exported
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

impl CsvTable {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column position by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get a cell by row position and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Append a row, resized to the table's column count
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        debug_assert!(cells.len() <= self.columns.len());
        cells.resize(self.columns.len(), String::new());
        self.rows.push(Row::new(cells));
    }

    /// Remove a column and its cells. Returns false if the column was absent.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.cells.remove(idx);
        }
        true
    }

    /// Return a copy aligned to `columns`
    ///
    /// Columns not in `columns` are discarded, missing ones are filled with
    /// the empty string, and cells are put in `columns` order.
    pub fn reindex(&self, columns: &[String]) -> CsvTable {
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let cells = mapping
                    .iter()
                    .map(|src| {
                        src.and_then(|i| row.get(i))
                            .map(str::to_string)
                            .unwrap_or_default()
                    })
                    .collect();
                Row::new(cells)
            })
            .collect();

        CsvTable {
            columns: columns.to_vec(),
            rows,
            sources: self.sources.clone(),
        }
    }

    /// Return a copy holding only the rows at `indices`, in that order
    pub fn select_rows(&self, indices: &[usize]) -> CsvTable {
        CsvTable {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
            sources: self.sources.clone(),
        }
    }
}

/// A row of data, one cell per table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// True if any cell contains `needle_lower` ignoring case
    ///
    /// `needle_lower` must already be lowercase.
    pub fn contains_ignore_case(&self, needle_lower: &str) -> bool {
        self.cells
            .iter()
            .any(|c| c.to_lowercase().contains(needle_lower))
    }
}
