use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::EnvFilter;

use talcleaner::batch::{self, RunOptions};
use talcleaner::cli::Cli;
use talcleaner::config::{self, AppConfig};
use talcleaner::logger::{RunLogger, VerbosityLevel};
use talcleaner::pipeline::CleaningPipeline;

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.tracing_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> AppConfig {
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };

    match loaded {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            eprintln!("❌ Configuration file not found at: {}", path.display());
            eprintln!("   Run with --init to create a default configuration file.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity());

    // Handle --init first (before any other processing)
    if cli.init {
        let target = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(config::CONFIG_PATH));
        match AppConfig::create_default_config(&target) {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run talcleaner again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = cli.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let app_config = load_config(&cli);
    let vocabulary = app_config
        .vocabulary()
        .context("Invalid vocabulary configuration")?;
    let pipeline = CleaningPipeline::new(vocabulary, &app_config.detection)
        .context("Failed to build name patterns from vocabulary")?;

    let input = cli.path.clone().context("An input file or folder is required")?;
    let inputs = batch::discover_inputs(&input, &app_config.output.report_file_name)?;
    if inputs.is_empty() {
        eprintln!("❌ No CSV or Excel files found in: {}", input.display());
        std::process::exit(1);
    }

    let options = RunOptions {
        output_dir: batch::resolve_output_dir(
            &input,
            cli.use_subfolder(&app_config.output),
            &app_config.output.subfolder_name,
        ),
        report: cli.write_report(&app_config.output),
        report_file_name: app_config.output.report_file_name.clone(),
    };

    let logger = match &cli.log_file {
        Some(path) => RunLogger::with_log_file(cli.verbosity(), path.clone()),
        None => RunLogger::new(cli.verbosity()),
    };

    logger.info(&format!(
        "Cleaning {} file(s) from {} into {}",
        inputs.len(),
        input.display(),
        options.output_dir.display()
    ));
    logger.start_progress(inputs.len() as u64);

    // The worker owns every table it reads; the main thread only renders progress
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        batch::run(&inputs, &pipeline, &options, |event| {
            let _ = tx.send(event);
        })
    });

    for event in rx {
        logger.handle_event(&event);
    }

    let result = worker
        .join()
        .map_err(|_| anyhow!("Cleaning worker panicked"))?;

    let exit_code = match result {
        Ok(summary) => {
            logger.finish_progress("Cleaning finished");
            logger.print_final_summary(&summary);
            0
        }
        Err(e) => {
            logger.finish_progress("Cleaning aborted");
            logger.error(&format!("{:#}", e));
            eprintln!("❌ {:#}", e);
            1
        }
    };

    if logger.is_log_export_enabled() {
        match logger.export_logs() {
            Ok(()) => {
                if let Some(path) = &cli.log_file {
                    println!("📄 Logs exported to: {}", path.display());
                }
            }
            Err(e) => eprintln!("❌ Failed to export logs: {:#}", e),
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
