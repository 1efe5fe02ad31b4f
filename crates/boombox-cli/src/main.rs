//! BoomBox Combiner CLI
//!
//! Command-line tool for merging, previewing, filtering and exporting
//! BoomBox CSV exports.

mod logging;

use boombox_core::{
    export_json_to_path, export_to_path, parse_csv, today_file_name, ExportKind, MergeJob,
    PendingFiles, PreviewSession, SortOrder,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "boombox")]
#[command(about = "BoomBox Combiner: merge and filter CSV exports", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs and ordering shared by every merging command
#[derive(Args)]
struct MergeArgs {
    /// CSV files or directories to merge, in order
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Sort direction for the "Time" column
    #[arg(short, long, value_enum, default_value_t = Order::Desc)]
    order: Order,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Oldest first
    Asc,
    /// Most recent first
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Ascending,
            Order::Desc => SortOrder::Descending,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the inputs and export the result
    Merge {
        #[command(flatten)]
        merge: MergeArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Output file path (defaults to BoomBox-<date>.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory for the default-named output file
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Show the merged table, optionally filtered
    Preview {
        #[command(flatten)]
        merge: MergeArgs,

        /// Only show rows with a cell containing this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,

        /// Rows of the filtered view to delete (1-based, comma-separated)
        #[arg(long, value_delimiter = ',')]
        delete: Vec<usize>,

        /// Delete without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Columns to display (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,
    },

    /// Merge, filter, optionally delete rows, and export the filtered view
    ExportFiltered {
        #[command(flatten)]
        merge: MergeArgs,

        /// Only keep rows with a cell containing this text (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,

        /// Rows of the filtered view to delete (1-based, comma-separated)
        #[arg(long, value_delimiter = ',')]
        delete: Vec<usize>,

        /// Delete without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Output file path (defaults to BoomBox-<date>-filtrado.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory for the default-named output file
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the text of a single cell of the (filtered) view
    Cell {
        #[command(flatten)]
        merge: MergeArgs,

        /// Filter applied before picking the row
        #[arg(short, long)]
        filter: Option<String>,

        /// Row number as displayed (1-based)
        #[arg(long)]
        row: usize,

        /// Column name
        #[arg(long)]
        col: String,
    },

    /// Parse and display a single CSV file
    Parse {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run a merge job file
    Run {
        /// Path to job file (JSON)
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Create a merge job file template
    CreateJob {
        /// Output path for the job file
        #[arg(long)]
        output: PathBuf,

        /// Input files or directories to include
        #[arg(short, long = "input")]
        inputs: Vec<PathBuf>,

        /// Sort direction for the "Time" column
        #[arg(short, long, value_enum, default_value_t = Order::Desc)]
        order: Order,

        /// Directory for the job's default-named output file
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    if let Err(e) = run(cli.command) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> boombox_core::Result<()> {
    match command {
        Commands::Merge {
            merge,
            format,
            output,
            out_dir,
        } => cmd_merge(&merge, format, output, out_dir),
        Commands::Preview {
            merge,
            filter,
            delete,
            yes,
            limit,
            columns,
        } => cmd_preview(&merge, filter.as_deref(), &delete, yes, limit, columns),
        Commands::ExportFiltered {
            merge,
            filter,
            delete,
            yes,
            output,
            out_dir,
        } => cmd_export_filtered(&merge, filter.as_deref(), &delete, yes, output, out_dir),
        Commands::Cell {
            merge,
            filter,
            row,
            col,
        } => cmd_cell(&merge, filter.as_deref(), row, &col),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Run { job } => cmd_run(&job),
        Commands::CreateJob {
            output,
            inputs,
            order,
            out_dir,
        } => cmd_create_job(&output, inputs, order, out_dir),
    }
}

fn pending_files(merge: &MergeArgs) -> boombox_core::Result<PendingFiles> {
    let mut pending = PendingFiles::new();
    for input in &merge.inputs {
        pending.add_path(input)?;
    }
    Ok(pending)
}

fn open_session(merge: &MergeArgs, filter: Option<&str>) -> boombox_core::Result<PreviewSession> {
    let merged = pending_files(merge)?.merge(merge.order.into())?;
    let mut session = PreviewSession::new(merged);
    if let Some(text) = filter {
        session.set_filter(text);
    }
    Ok(session)
}

fn resolve_output(output: Option<PathBuf>, out_dir: Option<PathBuf>, kind: ExportKind) -> PathBuf {
    output.unwrap_or_else(|| {
        let name = today_file_name(kind);
        match out_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    })
}

/// Ask a yes/no question on stdin
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Delete `rows` from the session after confirmation. Returns rows removed.
fn delete_confirmed(
    session: &mut PreviewSession,
    rows: &[usize],
    yes: bool,
) -> boombox_core::Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let positions: BTreeSet<usize> = rows.iter().copied().collect();
    if !yes && !confirm(&format!("Delete {} row(s)?", positions.len()))? {
        println!("Deletion cancelled");
        return Ok(0);
    }

    let removed = session.delete_rows(&positions);
    println!("Deleted {} row(s)", removed);
    Ok(removed)
}

fn cmd_merge(
    merge: &MergeArgs,
    format: Format,
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> boombox_core::Result<()> {
    let pending = pending_files(merge)?;
    let merged = pending.merge(merge.order.into())?;

    let explicit = output.is_some();
    let mut output = resolve_output(output, out_dir, ExportKind::Merged);
    let count = match format {
        Format::Csv => export_to_path(&merged, &output)?,
        Format::Json => {
            if !explicit {
                output.set_extension("json");
            }
            export_json_to_path(&merged, &output)?
        }
    };

    println!(
        "Merged {} file(s), exported {} rows to {}",
        pending.len(),
        count,
        output.display()
    );

    Ok(())
}

fn cmd_preview(
    merge: &MergeArgs,
    filter: Option<&str>,
    delete: &[usize],
    yes: bool,
    limit: Option<usize>,
    columns: Option<String>,
) -> boombox_core::Result<()> {
    let mut session = open_session(merge, filter)?;
    delete_confirmed(&mut session, delete, yes)?;

    let table = session.filtered();

    // Filter columns if specified
    let col_filter: Option<Vec<&str>> = columns.as_ref().map(|c| c.split(',').collect());
    let display_cols: Vec<(usize, &str)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            col_filter
                .as_ref()
                .map_or(true, |f| f.contains(&name.as_str()))
        })
        .map(|(i, name)| (i, name.as_str()))
        .collect();

    // Print header
    let header: Vec<&str> = display_cols.iter().map(|(_, name)| *name).collect();
    println!("N°\t{}", header.join("\t"));
    println!("{}", "-".repeat((header.len() + 1) * 12));

    // Print rows; '*' marks a "Time" shared with another visible row
    let row_limit = limit.unwrap_or(table.row_count());
    for (i, row) in table.rows.iter().take(row_limit).enumerate() {
        let position = i + 1;
        let marker = if session.is_duplicate(position) { "*" } else { "" };
        let values: Vec<&str> = display_cols
            .iter()
            .map(|(idx, _)| row.get(*idx).unwrap_or_default())
            .collect();
        println!("{}{}\t{}", position, marker, values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }

    println!();
    println!("{}", session.status_line());
    if !session.duplicate_time_mask().is_empty() {
        println!(
            "{} row(s) share a Time value with another row (marked *)",
            session.duplicate_time_mask().len()
        );
    }

    Ok(())
}

fn cmd_export_filtered(
    merge: &MergeArgs,
    filter: Option<&str>,
    delete: &[usize],
    yes: bool,
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> boombox_core::Result<()> {
    let mut session = open_session(merge, filter)?;
    delete_confirmed(&mut session, delete, yes)?;

    let output = resolve_output(output, out_dir, ExportKind::Filtered);
    let count = session.export_filtered(&output)?;

    println!("{}", session.status_line());
    println!("Exported {} rows to {}", count, output.display());

    Ok(())
}

fn cmd_cell(
    merge: &MergeArgs,
    filter: Option<&str>,
    row: usize,
    col: &str,
) -> boombox_core::Result<()> {
    let session = open_session(merge, filter)?;
    println!("{}", session.cell_text(row, col)?);
    Ok(())
}

fn cmd_parse(file: &Path) -> boombox_core::Result<()> {
    let table = parse_csv(file)?;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();

    // Print header
    println!("{}", table.columns.join("\t"));
    println!("{}", "-".repeat(table.column_count() * 12));

    // Print first 10 rows
    for row in table.rows.iter().take(10) {
        println!("{}", row.cells.join("\t"));
    }

    if table.row_count() > 10 {
        println!("... ({} more rows)", table.row_count() - 10);
    }

    Ok(())
}

fn cmd_run(job_path: &Path) -> boombox_core::Result<()> {
    let job = MergeJob::load(job_path)?;

    println!("Running job with {} input(s)", job.inputs.len());
    println!("Order: {}", job.order);
    if let Some(filter) = &job.filter {
        println!("Filter: {}", filter);
    }

    let outcome = job.run()?;

    println!();
    println!("Job complete:");
    if outcome.rows_deleted > 0 {
        println!("  {} rows deleted", outcome.rows_deleted);
    }
    println!(
        "  {} rows written to {}",
        outcome.rows_written,
        outcome.output.display()
    );

    Ok(())
}

fn cmd_create_job(
    output: &Path,
    inputs: Vec<PathBuf>,
    order: Order,
    out_dir: Option<PathBuf>,
) -> boombox_core::Result<()> {
    let mut job = if inputs.is_empty() {
        MergeJob::new(["export1.csv", "export2.csv"])
    } else {
        MergeJob::new(inputs)
    };
    job.order = order.into();
    job.output_dir = out_dir;

    job.save(output)?;
    println!("Created job file: {}", output.display());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  boombox run --job {}", output.display());

    Ok(())
}
