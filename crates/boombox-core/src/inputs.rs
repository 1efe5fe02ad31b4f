//! Pending list of input files awaiting a merge

use crate::error::{Error, Result};
use crate::merger::{merge_files, SortOrder};
use crate::table::CsvTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ordered list of files the user has picked
///
/// Duplicates are allowed and kept. Merging reads the list but never
/// changes it, so a failed merge leaves it as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFiles {
    files: Vec<PathBuf>,
}

impl PendingFiles {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files in the given order
    pub fn add<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
    }

    /// Append every `.csv` file under `root`, sorted by path
    ///
    /// Returns the number of files added.
    pub fn add_directory<P: AsRef<Path>>(&mut self, root: P) -> Result<usize> {
        let found = find_csv_files(root.as_ref())?;
        let count = found.len();
        self.files.extend(found);
        Ok(count)
    }

    /// Append `path`, expanding it if it is a directory
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        if path.is_dir() {
            self.add_directory(path)
        } else {
            self.files.push(path.to_path_buf());
            Ok(1)
        }
    }

    /// Remove the file at `index`
    pub fn remove(&mut self, index: usize) -> Result<PathBuf> {
        if index >= self.files.len() {
            return Err(Error::InvalidSelection(format!(
                "file {} is not in the list ({} files)",
                index,
                self.files.len()
            )));
        }
        Ok(self.files.remove(index))
    }

    /// Remove every file
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Files in merge order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if no files are pending
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge the pending files
    pub fn merge(&self, order: SortOrder) -> Result<CsvTable> {
        merge_files(&self.files, order)
    }
}

/// Find every `.csv` file under `root`, sorted by path
pub fn find_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            found.push(path.to_path_buf());
        }
    }

    found.sort();
    tracing::debug!(root = %root.display(), files = found.len(), "Collected CSV files");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_add_and_remove() {
        let mut pending = PendingFiles::new();
        pending.add(["a.csv", "b.csv", "a.csv"]);
        assert_eq!(pending.len(), 3);

        let removed = pending.remove(1).unwrap();
        assert_eq!(removed, PathBuf::from("b.csv"));
        assert_eq!(
            pending.files(),
            &[PathBuf::from("a.csv"), PathBuf::from("a.csv")]
        );

        pending.clear();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut pending = PendingFiles::new();
        pending.add(["a.csv"]);
        assert!(matches!(pending.remove(1), Err(Error::InvalidSelection(_))));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_merge_empty_list() {
        let pending = PendingFiles::new();
        assert!(matches!(
            pending.merge(SortOrder::Descending),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_failed_merge_keeps_list() {
        let mut pending = PendingFiles::new();
        pending.add(["/definitely/not/here.csv"]);
        let err = pending.merge(SortOrder::Descending).unwrap_err();
        assert!(err.is_load_error());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_add_directory_finds_csv_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.csv"), "Val\n1\n").unwrap();
        fs::write(dir.path().join("a.CSV"), "Val\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        fs::write(dir.path().join("nested").join("c.csv"), "Val\n1\n").unwrap();

        let mut pending = PendingFiles::new();
        let added = pending.add_path(dir.path()).unwrap();

        assert_eq!(added, 3);
        let names: Vec<_> = pending
            .files()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.CSV"),
                PathBuf::from("b.csv"),
                PathBuf::from("nested").join("c.csv"),
            ]
        );
    }
}
