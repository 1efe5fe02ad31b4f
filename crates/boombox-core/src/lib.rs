//! boombox-core: Core library for combining BoomBox CSV exports
//!
//! This library provides functionality to:
//! - Load CSV files into string tables, keeping every cell as raw text
//! - Merge several exports into one table aligned to the first file's columns
//! - Sort merged rows by their "Time" column
//! - Filter, highlight duplicate times and delete rows in a preview session
//! - Export tables back to CSV (or JSON)

pub mod error;
pub mod exporter;
pub mod inputs;
pub mod job;
pub mod merger;
pub mod parser;
pub mod table;
pub mod view;

pub use error::{Error, Result};
pub use exporter::{
    default_file_name, export_csv, export_json, export_json_to_path, export_to_path,
    today_file_name, ExportKind,
};
pub use inputs::{find_csv_files, PendingFiles};
pub use job::{JobOutcome, MergeJob};
pub use merger::{merge_files, merge_tables, parse_time, SortOrder, ID_COLUMN, TIME_COLUMN};
pub use parser::{parse_csv, parse_csv_str};
pub use table::{CsvTable, Row};
pub use view::PreviewSession;
