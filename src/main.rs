//! xml-audit CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use xml_audit::config::{CliOptions, ColorMode, OutputFormat};
use xml_audit::output::formatter_for;
use xml_audit::stop::{request_stop_file, DEFAULT_STOP_FILE};
use xml_audit::{BatchRunner, ClassifierStrategy, Config, StopFileWatcher, StopToken};

#[derive(Parser)]
#[command(
    name = "xml-audit",
    version,
    about = "Batch XML tag and attribute validator",
    long_about = "Checks every XML file in a directory for required tags and allowed attribute values, \
                  writing a timestamped report."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit every XML file in a directory
    Run {
        /// Directory holding the XML files
        dir: PathBuf,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Summary format (text, json)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Directory for the report file
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// How static-data files are recognized (textual, structural, hybrid)
        #[arg(long)]
        classifier: Option<ClassifierStrategy>,

        /// File whose creation stops the run
        #[arg(long, default_value = DEFAULT_STOP_FILE)]
        stop_file: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Print progress lines and info-level logs
        #[arg(short, long)]
        verbose: bool,
    },
    /// Ask a running audit to stop after its current file
    Stop {
        /// Stop file watched by the running audit
        #[arg(long, default_value = DEFAULT_STOP_FILE)]
        stop_file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Stop { stop_file } => {
            let ack = request_stop_file(&stop_file)
                .with_context(|| format!("Cannot create stop file {}", stop_file.display()))?;
            println!("{}", serde_json::to_string(&ack)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            dir,
            config,
            format,
            report_dir,
            classifier,
            stop_file,
            no_color,
            verbose,
        } => {
            let mut config = match config {
                Some(path) => Config::load(&path)
                    .with_context(|| format!("Cannot load config {}", path.display()))?,
                None => {
                    let cwd = std::env::current_dir().context("Cannot read current directory")?;
                    match Config::find_and_load(&cwd)? {
                        Some((path, config)) => {
                            debug!("Using config {}", path.display());
                            config
                        }
                        None => Config::default(),
                    }
                }
            };

            config.merge_cli(CliOptions {
                format,
                report_dir,
                strategy: classifier,
                verbose,
                no_color,
            });

            match config.output.color {
                ColorMode::Never => colored::control::set_override(false),
                ColorMode::Always => colored::control::set_override(true),
                ColorMode::Auto => {}
            }

            let token = StopToken::new();
            // The run still works without a watcher, it just cannot be stopped from outside
            let _watcher = match StopFileWatcher::spawn(&stop_file, token.clone()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!("Stop file watcher unavailable: {}", e);
                    None
                }
            };

            let formatter = formatter_for(&config.output);
            let runner = BatchRunner::new(config)?;
            let result = runner
                .run_directory(&dir, &token)
                .with_context(|| format!("Audit of {} failed", dir.display()))?;

            print!("{}", formatter.format(&result));
            if runner.config().output.format == OutputFormat::Json {
                println!();
            }

            Ok(ExitCode::from(result.exit_code() as u8))
        }
    }
}
