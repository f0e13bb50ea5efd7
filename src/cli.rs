use clap::Parser;
use std::path::PathBuf;

use crate::config::OutputConfig;
use crate::logger::VerbosityLevel;

#[derive(Parser, Debug)]
#[command(name = "talcleaner")]
#[command(about = "Detects the company column in account list spreadsheets and writes a deduplicated list of names or domains")]
#[command(version)]
pub struct Cli {
    /// CSV or Excel file to clean, or a folder of them
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Create default configuration file at ./config/talcleaner.toml
    #[arg(long)]
    pub init: bool,

    /// Configuration file (defaults to ./config/talcleaner.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write outputs into a dedicated subfolder next to the input
    #[arg(long, conflicts_with = "alongside")]
    pub subfolder: bool,

    /// Write outputs next to the input (overrides config)
    #[arg(long)]
    pub alongside: bool,

    /// Write the summary workbook
    #[arg(long, conflicts_with = "no_report")]
    pub report: bool,

    /// Skip the summary workbook (overrides config)
    #[arg(long)]
    pub no_report: bool,

    /// Verbose logging (use -v for per-table results, -vv for debug detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if self.init {
            return Ok(());
        }

        match &self.path {
            None => Err("An input file or folder is required (or use --init)".to_string()),
            Some(p) if p.as_os_str().is_empty() => Err("Input path cannot be empty".to_string()),
            Some(p) if !p.exists() => Err(format!("Input path does not exist: {}", p.display())),
            _ => Ok(()),
        }
    }

    /// True when the input is a folder (bulk mode)
    pub fn is_folder_mode(&self) -> bool {
        self.path.as_ref().is_some_and(|p| p.is_dir())
    }

    /// Subfolder switch: flag, then config, then mode default
    pub fn use_subfolder(&self, output: &OutputConfig) -> bool {
        if self.subfolder {
            true
        } else if self.alongside {
            false
        } else if self.is_folder_mode() {
            output.folder_subfolder
        } else {
            output.single_file_subfolder
        }
    }

    /// Report switch: flag, then config
    pub fn write_report(&self, output: &OutputConfig) -> bool {
        if self.report {
            true
        } else if self.no_report {
            false
        } else {
            output.report
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_verbose_count(self.verbose)
    }
}
