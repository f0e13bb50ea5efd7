//! Batch cleaning: input discovery, table ingestion and the run loop
//!
//! Supports:
//! - A single CSV or workbook file, or every supported file in a folder
//! - CSV (UTF-8, optional BOM) and Excel workbooks (xls, xlsx, xlsm), one
//!   table per sheet
//! - Header-row sniffing by keyword
//! - Error resilience: a file or sheet that cannot be cleaned is skipped and
//!   listed in the summary; only output write failures abort the run

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::export::{
    clean_output_filename, export_clean_csv, export_report_xlsx, unique_output_filename,
};
use crate::pipeline::{CleaningPipeline, CleaningReport, TableError};
use crate::table::{Cell, ColumnClassification, Table};
use crate::vocabulary::Vocabulary;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Input format for table files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    /// CSV file
    Csv,
    /// Excel workbook (xls, xlsx, xlsm)
    Workbook,
}

impl InputFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("csv") => Some(Self::Csv),
            Some("xls") | Some("xlsx") | Some("xlsm") => Some(Self::Workbook),
            _ => None,
        }
    }
}

/// Where a table came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLabel {
    /// File name including extension
    pub file_name: String,
    /// File name without extension
    pub stem: String,
    /// Sheet name, only for workbooks with more than one sheet
    pub sheet: Option<String>,
}

impl SourceLabel {
    pub fn for_file(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        Self {
            file_name,
            stem,
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{} ({})", self.file_name, sheet),
            None => f.write_str(&self.file_name),
        }
    }
}

/// One table produced by ingestion
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub label: SourceLabel,
    pub table: Table,
    /// Row 0 was consumed as column headers
    pub reused_header: bool,
}

/// A workbook sheet that could not be read
#[derive(Debug, Clone)]
pub struct UnreadableSheet {
    pub label: SourceLabel,
    pub reason: TableError,
}

/// One table of an input file, or the reason it could not be read
pub type SheetRead = Result<SourceTable, UnreadableSheet>;

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory receiving cleaned files and the report
    pub output_dir: PathBuf,
    /// Write the summary workbook at the end of the run
    pub report: bool,
    pub report_file_name: String,
}

/// Result of one table in a run
#[derive(Debug, Clone)]
pub enum TableStatus {
    Cleaned {
        classification: ColumnClassification,
        original_rows: usize,
        cleaned_rows: usize,
        output_file: PathBuf,
    },
    Skipped {
        reason: TableError,
    },
}

#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub label: String,
    pub status: TableStatus,
}

impl TableOutcome {
    pub fn is_cleaned(&self) -> bool {
        matches!(self.status, TableStatus::Cleaned { .. })
    }
}

/// Progress notifications emitted while a run is in flight
#[derive(Debug, Clone)]
pub enum RunEvent {
    FileStarted {
        index: usize,
        total: usize,
        file_name: String,
    },
    TableFinished(TableOutcome),
}

/// Summary of a cleaning run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Number of input files processed
    pub total_files: usize,
    /// Tables written to a clean file
    pub tables_cleaned: usize,
    /// Tables skipped (unreadable, empty, or no usable column)
    pub tables_skipped: usize,
    pub total_original_rows: usize,
    pub total_cleaned_rows: usize,
    /// Outcome per table in processing order
    pub outcomes: Vec<TableOutcome>,
    /// Report rows accumulated over the run
    pub report: CleaningReport,
    pub report_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Total run duration in seconds
    pub total_duration_secs: f64,
    /// Timestamp when the run started
    pub started_at: String,
    /// Timestamp when the run completed
    pub completed_at: String,
}

/// Create a new batch summary
pub fn new_batch_summary(output_dir: PathBuf) -> BatchSummary {
    BatchSummary {
        total_files: 0,
        tables_cleaned: 0,
        tables_skipped: 0,
        total_original_rows: 0,
        total_cleaned_rows: 0,
        outcomes: Vec::new(),
        report: CleaningReport::new(),
        report_path: None,
        output_dir,
        total_duration_secs: 0.0,
        started_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        completed_at: String::new(),
    }
}

/// Finalize a batch summary with end time and totals
pub fn finalize_batch_summary(summary: &mut BatchSummary, duration_secs: f64) {
    summary.completed_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    summary.total_duration_secs = duration_secs;
    summary.tables_cleaned = summary.outcomes.iter().filter(|o| o.is_cleaned()).count();
    summary.tables_skipped = summary.outcomes.len() - summary.tables_cleaned;
    summary.total_original_rows = summary.report.total_original_rows();
    summary.total_cleaned_rows = summary.report.total_cleaned_rows();
}

// ============================================================================
// Input discovery
// ============================================================================

/// True for files this tool wrote on an earlier run.
fn is_generated_output(file_name: &str, report_file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower == report_file_name.to_lowercase()
        || lower.ends_with("_clean_name.csv")
        || lower.ends_with("_clean_domain.csv")
}

/// Files to process for `path`: the file itself, or every supported file in
/// the folder sorted by name. Earlier outputs and Office lock files are
/// skipped in folder mode.
pub fn discover_inputs(path: &Path, report_file_name: &str) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if InputFormat::from_path(path).is_none() {
            bail!(
                "Unsupported file type: {} (expected .csv, .xls, .xlsx or .xlsm)",
                path.display()
            );
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("Input path does not exist: {}", path.display());
    }

    let mut inputs = Vec::new();
    let entries = fs::read_dir(path).context(format!("Failed to read folder: {}", path.display()))?;
    for entry in entries {
        let entry = entry.context(format!("Failed to read folder entry in: {}", path.display()))?;
        let candidate = entry.path();
        if !candidate.is_file() || InputFormat::from_path(&candidate).is_none() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with("~$") || is_generated_output(&file_name, report_file_name) {
            debug!("Skipping {}", file_name);
            continue;
        }
        inputs.push(candidate);
    }

    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

/// Output directory for a run over `input`.
pub fn resolve_output_dir(input: &Path, use_subfolder: bool, subfolder_name: &str) -> PathBuf {
    let base = if input.is_dir() {
        input.to_path_buf()
    } else {
        match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    };

    if use_subfolder {
        base.join(subfolder_name)
    } else {
        base
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Row 0 is a header when any of its text cells contains a header keyword.
pub fn has_header<'a>(first_row: impl IntoIterator<Item = &'a str>, vocab: &Vocabulary) -> bool {
    first_row.into_iter().any(|value| vocab.looks_like_header(value))
}

fn into_table(mut rows: Vec<Vec<Cell>>, reused_header: bool) -> Table {
    if reused_header && !rows.is_empty() {
        let header = rows
            .remove(0)
            .into_iter()
            .map(|cell| cell.as_str().unwrap_or("").to_string())
            .collect();
        Table::from_rows(Some(header), rows)
    } else {
        Table::from_rows(None, rows)
    }
}

/// Parse CSV bytes into a table. Returns the table and whether row 0 was
/// used as the header.
pub fn parse_csv_bytes(bytes: &[u8], vocab: &Vocabulary) -> Result<(Table, bool), TableError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let content = std::str::from_utf8(bytes)
        .map_err(|e| TableError::MalformedSource(format!("not valid UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| TableError::MalformedSource(format!("invalid CSV: {}", e)))?;
        rows.push(record.iter().map(Cell::from_raw).collect::<Vec<_>>());
    }

    let reused_header = rows
        .first()
        .map(|row| has_header(row.iter().filter_map(|c| c.as_str()), vocab))
        .unwrap_or(false);

    Ok((into_table(rows, reused_header), reused_header))
}

pub fn read_csv(path: &Path, vocab: &Vocabulary) -> Result<SourceTable, TableError> {
    let bytes = fs::read(path).map_err(|e| TableError::MalformedSource(e.to_string()))?;
    let (table, reused_header) = parse_csv_bytes(&bytes, vocab)?;
    Ok(SourceTable {
        label: SourceLabel::for_file(path),
        table,
        reused_header,
    })
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Missing,
        Data::String(s) => Cell::from_raw(s),
        other => Cell::from_raw(&other.to_string()),
    }
}

/// Read every sheet of a workbook as its own table.
///
/// A workbook that cannot be opened is an error for the whole file; a sheet
/// that cannot be read is returned as an [`UnreadableSheet`] next to the
/// sheets that could.
pub fn read_workbook(path: &Path, vocab: &Vocabulary) -> Result<Vec<SheetRead>, TableError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| TableError::MalformedSource(e.to_string()))?;
    let sheet_names = workbook.sheet_names();
    let qualify = sheet_names.len() > 1;

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        let label = SourceLabel::for_file(path);
        let label = if qualify { label.with_sheet(sheet.clone()) } else { label };

        let range = match workbook.worksheet_range(&sheet) {
            Ok(range) => range,
            Err(e) => {
                tables.push(Err(UnreadableSheet {
                    label,
                    reason: TableError::MalformedSource(format!("sheet '{}': {}", sheet, e)),
                }));
                continue;
            }
        };

        let reused_header = range
            .rows()
            .next()
            .map(|row| {
                has_header(
                    row.iter().filter_map(|data| match data {
                        Data::String(s) => Some(s.as_str()),
                        _ => None,
                    }),
                    vocab,
                )
            })
            .unwrap_or(false);

        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(workbook_cell).collect())
            .collect();

        tables.push(Ok(SourceTable {
            label,
            table: into_table(rows, reused_header),
            reused_header,
        }));
    }

    Ok(tables)
}

/// Read all tables from one input file.
pub fn read_source(path: &Path, vocab: &Vocabulary) -> Result<Vec<SheetRead>, TableError> {
    match InputFormat::from_path(path) {
        Some(InputFormat::Csv) => read_csv(path, vocab).map(|t| vec![Ok(t)]),
        Some(InputFormat::Workbook) => read_workbook(path, vocab),
        None => Err(TableError::MalformedSource(format!(
            "unsupported file type: {}",
            path.display()
        ))),
    }
}

// ============================================================================
// Run
// ============================================================================

/// Clean every table of every input, writing one clean file per table and,
/// when enabled, the summary workbook.
///
/// Tables that cannot be cleaned are skipped; an error is returned only when
/// an output cannot be written.
pub fn run<F>(
    inputs: &[PathBuf],
    pipeline: &CleaningPipeline,
    options: &RunOptions,
    mut on_event: F,
) -> Result<BatchSummary>
where
    F: FnMut(RunEvent),
{
    let start = Instant::now();
    let mut summary = new_batch_summary(options.output_dir.clone());
    summary.total_files = inputs.len();

    let mut report = CleaningReport::new();
    let mut written = HashSet::new();

    for (index, path) in inputs.iter().enumerate() {
        let file_label = SourceLabel::for_file(path);
        info!("Processing {}", file_label);
        on_event(RunEvent::FileStarted {
            index,
            total: inputs.len(),
            file_name: file_label.file_name.clone(),
        });

        let sources = match read_source(path, pipeline.vocabulary()) {
            Ok(sources) => sources,
            Err(reason) => {
                warn!("Skipping {}: {}", file_label, reason);
                let outcome = TableOutcome {
                    label: file_label.to_string(),
                    status: TableStatus::Skipped { reason },
                };
                on_event(RunEvent::TableFinished(outcome.clone()));
                summary.outcomes.push(outcome);
                continue;
            }
        };

        for read in sources {
            let source = match read {
                Ok(source) => source,
                Err(UnreadableSheet { label, reason }) => {
                    let label = label.to_string();
                    warn!("Skipping {}: {}", label, reason);
                    let outcome = TableOutcome {
                        label,
                        status: TableStatus::Skipped { reason },
                    };
                    on_event(RunEvent::TableFinished(outcome.clone()));
                    summary.outcomes.push(outcome);
                    continue;
                }
            };

            let label = source.label.to_string();
            debug!("{}: header row reused = {}", label, source.reused_header);

            let status = match pipeline.clean(source.table, &label) {
                Ok(cleaned) => {
                    let file_name =
                        unique_output_filename(&source.label, cleaned.report.classification, &written);
                    if file_name != clean_output_filename(&source.label, cleaned.report.classification) {
                        warn!("{}: output name already used in this run, writing {}", label, file_name);
                    }
                    let output_file = options.output_dir.join(&file_name);
                    export_clean_csv(&cleaned.table, &output_file)?;
                    written.insert(file_name);

                    let status = TableStatus::Cleaned {
                        classification: cleaned.report.classification,
                        original_rows: cleaned.report.original_row_count,
                        cleaned_rows: cleaned.report.cleaned_row_count,
                        output_file,
                    };
                    report = report.record(cleaned.report);
                    status
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", label, reason);
                    TableStatus::Skipped { reason }
                }
            };

            let outcome = TableOutcome { label, status };
            on_event(RunEvent::TableFinished(outcome.clone()));
            summary.outcomes.push(outcome);
        }
    }

    if options.report {
        let report_path = options.output_dir.join(&options.report_file_name);
        export_report_xlsx(&report, &report_path)?;
        summary.report_path = Some(report_path);
    }

    summary.report = report;
    finalize_batch_summary(&mut summary, start.elapsed().as_secs_f64());
    Ok(summary)
}
