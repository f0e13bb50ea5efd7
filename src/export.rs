use crate::batch::{BatchSummary, SourceLabel, TableStatus};
use crate::pipeline::CleaningReport;
use crate::table::{ColumnClassification, Table};
use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

const REPORT_HEADERS: [&str; 4] = ["File Name", "Type", "Original Rows", "Cleaned Rows"];
const REPORT_COLUMN_WIDTHS: [f64; 4] = [40.0, 10.0, 15.0, 15.0];

fn sanitize_sheet_name(sheet: &str) -> String {
    sheet
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// `<stem>_clean_<type>.csv`, or `<stem>_<sheet>_clean_<type>.csv` for
/// tables from multi-sheet workbooks.
pub fn clean_output_filename(label: &SourceLabel, classification: ColumnClassification) -> String {
    match &label.sheet {
        Some(sheet) => format!(
            "{}_{}_clean_{}.csv",
            label.stem,
            sanitize_sheet_name(sheet),
            classification
        ),
        None => format!("{}_clean_{}.csv", label.stem, classification),
    }
}

/// Like [`clean_output_filename`], but never one of `taken`. A clash (e.g.
/// `a.csv` and `a.xlsx` in one folder) is resolved by qualifying the stem
/// with the source extension, then with a counter.
pub fn unique_output_filename(
    label: &SourceLabel,
    classification: ColumnClassification,
    taken: &HashSet<String>,
) -> String {
    let name = clean_output_filename(label, classification);
    if !taken.contains(&name) {
        return name;
    }

    let extension = Path::new(&label.file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let base_stem = if extension.is_empty() {
        label.stem.clone()
    } else {
        format!("{}_{}", label.stem, extension)
    };

    let mut candidate = SourceLabel {
        stem: base_stem.clone(),
        ..label.clone()
    };
    let mut counter = 2;
    loop {
        let name = clean_output_filename(&candidate, classification);
        if !taken.contains(&name) {
            return name;
        }
        candidate.stem = format!("{}_{}", base_stem, counter);
        counter += 1;
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create output folder: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Write the first column of `table` as a headerless CSV with a UTF-8 BOM.
pub fn export_clean_csv(table: &Table, output_path: &Path) -> Result<()> {
    debug!("Exporting {} rows to CSV: {}", table.row_count(), output_path.display());
    ensure_parent(output_path)?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create output file: {}", output_path.display()))?;
    file.write_all(b"\xEF\xBB\xBF")
        .context(format!("Failed to write output file: {}", output_path.display()))?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    for value in table.values(0) {
        wtr.write_record([value])
            .context(format!("Failed to write output file: {}", output_path.display()))?;
    }

    wtr.flush()
        .context(format!("Failed to write output file: {}", output_path.display()))?;
    info!("Wrote {} rows to {}", table.row_count(), output_path.display());

    Ok(())
}

/// Write the run report as a workbook with a bold header row.
pub fn export_report_xlsx(report: &CleaningReport, output_path: &Path) -> Result<()> {
    debug!("Exporting {} report rows to: {}", report.len(), output_path.display());
    ensure_parent(output_path)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, (header, width)) in REPORT_HEADERS.iter().zip(REPORT_COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &bold)?;
        sheet.set_column_width(col, width)?;
    }

    for (index, row) in report.rows().iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string(r, 0, &row.source_label)?;
        sheet.write_string(r, 1, row.classification.as_str())?;
        sheet.write_number(r, 2, row.original_row_count as f64)?;
        sheet.write_number(r, 3, row.cleaned_row_count as f64)?;
    }

    workbook
        .save(output_path)
        .context(format!("Failed to write report: {}", output_path.display()))?;
    info!("Report saved to {}", output_path.display());

    Ok(())
}

pub fn print_run_summary(summary: &BatchSummary) {
    println!("\n=== Cleaning Summary ===");
    println!("Files processed: {}", summary.total_files);
    println!("Tables cleaned: {}", summary.tables_cleaned);
    println!("Tables skipped: {}", summary.tables_skipped);
    println!(
        "Rows: {} original -> {} cleaned",
        summary.total_original_rows, summary.total_cleaned_rows
    );

    for outcome in &summary.outcomes {
        match &outcome.status {
            TableStatus::Cleaned {
                classification,
                original_rows,
                cleaned_rows,
                output_file,
            } => println!(
                "  ✓ {} [{}] {} -> {} => {}",
                outcome.label,
                classification,
                original_rows,
                cleaned_rows,
                output_file.display()
            ),
            TableStatus::Skipped { reason } => {
                println!("  ✗ {} skipped: {}", outcome.label, reason)
            }
        }
    }

    println!("Output folder: {}", summary.output_dir.display());
    if let Some(report_path) = &summary.report_path {
        println!("Report: {}", report_path.display());
    }
    println!("Completed in {:.2}s", summary.total_duration_secs);
}
