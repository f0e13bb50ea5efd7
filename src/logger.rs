use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::batch::{BatchSummary, RunEvent, TableStatus};
use crate::export::print_run_summary;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Summary = 1,  // Per-file progress (default)
    Detailed = 2, // Per-table results and skips
    Debug = 3,    // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn tracing_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Summary => "warn",
            VerbosityLevel::Detailed => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// User-facing run output: timestamped messages, a progress bar and an
/// optional log file written at the end of the run.
#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<PathBuf>,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: PathBuf) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    /// Shown at every verbosity level.
    pub fn info(&self, message: &str) {
        self.print_message("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    /// Always shown.
    pub fn error(&self, message: &str) {
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let msg = format!("[{}] {}: {}", timestamp, level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Print above the bar so it keeps its position
        if let Ok(guard) = self.progress_bar.read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    pub fn start_progress(&self, total_files: u64) {
        let pb = ProgressBar::new(total_files);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Starting...");

        if let Ok(mut guard) = self.progress_bar.write() {
            *guard = Some(pb);
        }
    }

    pub fn update_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.read() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
            }
        }
    }

    pub fn set_progress_position(&self, position: u64) {
        if let Ok(guard) = self.progress_bar.read() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(position);
            }
        }
    }

    pub fn finish_progress(&self, final_message: &str) {
        if let Ok(mut guard) = self.progress_bar.write() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        self.info(final_message);
    }

    /// Translate a worker progress event into output.
    pub fn handle_event(&self, event: &RunEvent) {
        match event {
            RunEvent::FileStarted {
                index,
                total,
                file_name,
            } => {
                self.set_progress_position(*index as u64);
                self.update_progress(file_name);
                self.info(&format!("[{}/{}] Cleaning {}", index + 1, total, file_name));
            }
            RunEvent::TableFinished(outcome) => match &outcome.status {
                TableStatus::Cleaned {
                    classification,
                    original_rows,
                    cleaned_rows,
                    output_file,
                } => {
                    self.info(&format!(
                        "{}: {} column, {} -> {} rows",
                        outcome.label, classification, original_rows, cleaned_rows
                    ));
                    self.debug(&format!("Wrote {}", output_file.display()));
                }
                TableStatus::Skipped { reason } => {
                    self.warn(&format!("{} skipped: {}", outcome.label, reason));
                }
            },
        }
    }

    pub fn print_final_summary(&self, summary: &BatchSummary) {
        print!("\x1b[2K\r");
        let _ = io::stdout().flush();

        print_run_summary(summary);

        if summary.tables_cleaned > 0 {
            println!(
                "✅ Cleaning completed! {} table(s) cleaned, {} rows kept.",
                summary.tables_cleaned, summary.total_cleaned_rows
            );
        } else {
            println!("✅ Cleaning completed. No tables could be cleaned.");
        }
    }

    /// Write all collected messages to the log file, if one was requested
    pub fn export_logs(&self) -> Result<()> {
        let Some(log_file_path) = &self.log_file_path else {
            return Ok(());
        };

        if let Some(parent) = log_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create log folder: {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .context(format!("Failed to open log file: {}", log_file_path.display()))?;

        if let Ok(buffer) = self.log_buffer.lock() {
            for entry in buffer.iter() {
                writeln!(file, "{}", entry)?;
            }
        }
        file.flush()?;
        Ok(())
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}
