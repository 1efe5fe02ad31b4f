//! Error types for boombox-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in boombox-core
#[derive(Debug, Error)]
pub enum Error {
    /// No input files were given to a merge
    #[error("no input files selected")]
    EmptyInput,

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File was readable but is not a usable table
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Failed to write an export
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filtered view has no rows to export
    #[error("no rows to export")]
    NothingToExport,

    /// A selection referred to something that does not exist
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A value supplied by the caller could not be understood
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors raised while loading an input file
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. } | Error::CsvParse { .. } | Error::Csv { .. }
        )
    }

    /// True for errors raised while writing output
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Write { .. } | Error::Io(_))
    }
}
