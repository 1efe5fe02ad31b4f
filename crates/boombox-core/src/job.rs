//! Merge job files
//!
//! A job bundles the inputs, sort order and output of one merge in a JSON
//! file so it can be re-run without picking files again.

use crate::error::{Error, Result};
use crate::exporter::{export_to_path, today_file_name, ExportKind};
use crate::inputs::PendingFiles;
use crate::merger::SortOrder;
use crate::view::PreviewSession;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A merge job loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeJob {
    /// Input files or directories, in merge order
    pub inputs: Vec<PathBuf>,
    /// Sort direction for the "Time" column
    #[serde(default)]
    pub order: SortOrder,
    /// Filter text applied before export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// 1-based rows of the filtered view to delete before export
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_rows: Vec<usize>,
    /// Exact output file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Directory for a default-named output file, used when `output` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// What a job run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// File written
    pub output: PathBuf,
    /// Data rows written
    pub rows_written: usize,
    /// Rows removed by `delete_rows`
    pub rows_deleted: usize,
}

impl MergeJob {
    /// Create a job for `inputs` with default settings
    pub fn new<I, P>(inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Load a job file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the job file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| Error::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// True if the job exports a filtered view rather than the full merge
    pub fn is_filtered(&self) -> bool {
        self.filter.as_deref().is_some_and(|f| !f.is_empty()) || !self.delete_rows.is_empty()
    }

    /// Where the job writes its output
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }

        let kind = if self.is_filtered() {
            ExportKind::Filtered
        } else {
            ExportKind::Merged
        };
        let name = today_file_name(kind);
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Collect the inputs into a pending list, expanding directories
    pub fn pending_files(&self) -> Result<PendingFiles> {
        let mut pending = PendingFiles::new();
        for input in &self.inputs {
            pending.add_path(input)?;
        }
        Ok(pending)
    }

    /// Merge, optionally filter and delete, then export
    pub fn run(&self) -> Result<JobOutcome> {
        let merged = self.pending_files()?.merge(self.order)?;
        let output = self.output_path();

        if !self.is_filtered() {
            let rows_written = export_to_path(&merged, &output)?;
            return Ok(JobOutcome {
                output,
                rows_written,
                rows_deleted: 0,
            });
        }

        let mut session = PreviewSession::new(merged);
        if let Some(filter) = &self.filter {
            session.set_filter(filter);
        }
        let positions: BTreeSet<usize> = self.delete_rows.iter().copied().collect();
        let rows_deleted = session.delete_rows(&positions);
        let rows_written = session.export_filtered(&output)?;

        Ok(JobOutcome {
            output,
            rows_written,
            rows_deleted,
        })
    }
}
