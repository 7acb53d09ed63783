//! AAT Extract CLI - Command-line interface for AAT Extract
//!
//! Commands:
//! - batch: Extract every log of an input directory (batch mode)
//! - extract: Extract a single log
//! - inspect: Diagnose the column layout and baseline of a log

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use aat_extract::classifier::{block_number, resolve_column};
use aat_extract::config::{Config, ConfigError};
use aat_extract::display::TableView;
use aat_extract::export::{export_results, write_results};
use aat_extract::pipeline::{analyze, Baseline};
use aat_extract::reader::read_log_file;
use aat_extract::types::Congruency;
use aat_extract::{BatchRunner, ColumnIndexMap, ExtractError, ResultTable, PRODUCER_NAME, VERSION};

/// AAT Extract - onset and response-time extraction for Approach-Avoidance Task logs
#[derive(Parser)]
#[command(name = "aat-extract")]
#[command(version = VERSION)]
#[command(about = "Extract per-condition onset and response times from AAT logs", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every log of an input directory (batch mode)
    Batch {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory containing raw logs (overrides the config file)
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory receiving the exports (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Record failing logs and continue with the next one
        #[arg(long)]
        keep_going: bool,

        /// When to print result tables to the console
        #[arg(long, value_enum, default_value = "auto")]
        display: DisplayMode,

        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a single log
    Extract {
        /// Input log path
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "delimited")]
        format: OutputFormat,

        /// When to print the result table to the console
        #[arg(long, value_enum, default_value = "auto")]
        display: DisplayMode,
    },

    /// Diagnose the column layout and baseline of a log
    Inspect {
        /// Input log path
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DisplayMode {
    /// Only when stdout is a terminal
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Semicolon-separated columns
    Delimited,
    /// Pretty-printed JSON object of series
    Json,
}

impl DisplayMode {
    fn enabled(self, default: bool) -> bool {
        match self {
            DisplayMode::Auto => default && atty::is(atty::Stream::Stdout),
            DisplayMode::Always => true,
            DisplayMode::Never => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), AatCliError> {
    match cli.command {
        Commands::Batch {
            config,
            input_dir,
            output_dir,
            keep_going,
            display,
            json,
        } => cmd_batch(
            config.as_deref(),
            input_dir,
            output_dir,
            keep_going,
            display,
            json,
        ),

        Commands::Extract {
            input,
            output,
            format,
            display,
        } => cmd_extract(&input, &output, format, display),

        Commands::Inspect { input, json } => cmd_inspect(&input, json),
    }
}

fn cmd_batch(
    config_path: Option<&Path>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    keep_going: bool,
    display: DisplayMode,
    json: bool,
) -> Result<(), AatCliError> {
    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(dir) = input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if keep_going {
        config.continue_on_error = true;
    }
    let show_tables = display.enabled(config.display);

    let runner = BatchRunner::new(config);
    let report = runner.run_with(|path, table| {
        if show_tables {
            print_table(path, table);
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Batch Report");
        println!("============");
        println!("Input:     {}", report.input_dir.display());
        println!("Output:    {}", report.output_dir.display());
        println!("Processed: {}", report.processed.len());
        println!("Failed:    {}", report.failed.len());

        if !report.failed.is_empty() {
            println!("\nFailures:");
            for failure in &report.failed {
                println!("  - {}: {}", failure.file_name, failure.error);
            }
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(AatCliError::BatchIncomplete(report.failed.len()))
    }
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    display: DisplayMode,
) -> Result<(), AatCliError> {
    let to_stdout = output.to_string_lossy() == "-";

    let table = read_log_file(input).map_err(|e| e.in_file(input))?;
    let result = analyze(&table).map_err(|e| e.in_file(input))?;

    if display.enabled(!to_stdout) {
        print_table(input, &result);
    }

    match (format, to_stdout) {
        (OutputFormat::Delimited, true) => {
            let stdout = io::stdout();
            write_results(stdout.lock(), &result)?;
        }
        (OutputFormat::Delimited, false) => export_results(output, &result)?,
        (OutputFormat::Json, true) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        (OutputFormat::Json, false) => {
            std::fs::write(output, serde_json::to_string_pretty(&result)?)?;
        }
    }

    Ok(())
}

fn cmd_inspect(input: &Path, json: bool) -> Result<(), AatCliError> {
    let table = read_log_file(input).map_err(|e| e.in_file(input))?;
    let header = table.first().ok_or(ExtractError::EmptyLog)?;
    let indices = ColumnIndexMap::resolve(header);

    // Rows 1..len-1 are classified; the last one is never read
    let classified = table.len().saturating_sub(2);
    let blocks_needed = if classified > 0 {
        block_number(classified)
    } else {
        0
    };

    let mut missing_block_columns = Vec::new();
    for block in 1..=blocks_needed {
        for condition in [Congruency::Congruent, Congruency::Incongruent] {
            for instructional in [false, true] {
                let label = resolve_column(condition, instructional, block);
                if !indices.contains(label) {
                    missing_block_columns.push(label.column_name());
                }
            }
        }
    }

    let (baseline, baseline_error) = match table.get(1) {
        Some(row) => match Baseline::read(&indices, row) {
            Ok(baseline) => (Some(baseline), None),
            Err(e) => (None, Some(e.to_string())),
        },
        None => (None, Some(ExtractError::MissingBaselineRow.to_string())),
    };

    let report = InspectReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        file: input.display().to_string(),
        rows: table.len(),
        trials_classified: classified,
        blocks_needed,
        blocks_available: indices.max_block().unwrap_or(0),
        columns: indices
            .entries()
            .into_iter()
            .map(|(label, position)| InspectColumn {
                name: label.column_name(),
                position,
            })
            .collect(),
        missing_columns: indices
            .missing_static()
            .iter()
            .map(|c| c.column_name().to_string())
            .collect(),
        missing_block_columns,
        baseline,
        baseline_error,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Log Inspection Report");
        println!("=====================");
        println!("File:    {}", report.file);
        println!("Rows:    {} ({} classified trials)", report.rows, report.trials_classified);
        println!(
            "Blocks:  {} needed, {} in header",
            report.blocks_needed, report.blocks_available
        );

        println!("\nColumns:");
        for column in &report.columns {
            println!("  [{:>3}] {}", column.position, column.name);
        }

        match (&report.baseline, &report.baseline_error) {
            (Some(b), _) => println!(
                "\nBaseline: {} + {} = {} ms",
                b.response_time_mri_trigger,
                b.time_mri_trigger,
                b.excess()
            ),
            (None, Some(e)) => println!("\nBaseline: [ERR] {}", e),
            (None, None) => {}
        }

        for name in report.missing_columns.iter().chain(&report.missing_block_columns) {
            println!("  [ERR] missing column {}", name);
        }
    }

    let problems = report.missing_columns.len()
        + report.missing_block_columns.len()
        + usize::from(report.baseline_error.is_some());
    if problems > 0 {
        Err(AatCliError::InspectFailed(problems))
    } else {
        Ok(())
    }
}

// Helper functions

fn print_table(path: &Path, table: &ResultTable) {
    println!("\nFile: {}", path.display());
    print!("{}", TableView(table));
}

// Error types

#[derive(Debug)]
enum AatCliError {
    Io(io::Error),
    Extract(ExtractError),
    Config(ConfigError),
    Json(serde_json::Error),
    BatchIncomplete(usize),
    InspectFailed(usize),
}

impl From<io::Error> for AatCliError {
    fn from(e: io::Error) -> Self {
        AatCliError::Io(e)
    }
}

impl From<ExtractError> for AatCliError {
    fn from(e: ExtractError) -> Self {
        AatCliError::Extract(e)
    }
}

impl From<ConfigError> for AatCliError {
    fn from(e: ConfigError) -> Self {
        AatCliError::Config(e)
    }
}

impl From<serde_json::Error> for AatCliError {
    fn from(e: serde_json::Error) -> Self {
        AatCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AatCliError> for CliError {
    fn from(e: AatCliError) -> Self {
        match e {
            AatCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AatCliError::Extract(e) => {
                let hint = match root_cause(&e) {
                    ExtractError::MissingColumn(_) | ExtractError::MissingCell { .. } => {
                        "Run 'aat-extract inspect' on the log to check its columns"
                    }
                    ExtractError::NonNumeric { .. } => "Onset and trigger cells must be integers",
                    ExtractError::MissingCategory { .. } => {
                        "Check the Image and ExperimentType cells of the reported row"
                    }
                    _ => "Check the log file",
                };
                CliError {
                    code: "EXTRACT_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            AatCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the configuration file".to_string()),
            },
            AatCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            AatCliError::BatchIncomplete(count) => CliError {
                code: "BATCH_INCOMPLETE".to_string(),
                message: format!("{} logs failed", count),
                hint: Some("Review the batch report for details".to_string()),
            },
            AatCliError::InspectFailed(count) => CliError {
                code: "INSPECT_FAILED".to_string(),
                message: format!("{} problems found", count),
                hint: Some("Review the inspection report for details".to_string()),
            },
        }
    }
}

fn root_cause(e: &ExtractError) -> &ExtractError {
    match e {
        ExtractError::File { source, .. } => root_cause(source),
        other => other,
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    producer: String,
    version: String,
    file: String,
    rows: usize,
    trials_classified: usize,
    blocks_needed: u32,
    blocks_available: u32,
    columns: Vec<InspectColumn>,
    missing_columns: Vec<String>,
    missing_block_columns: Vec<String>,
    baseline: Option<Baseline>,
    baseline_error: Option<String>,
}

#[derive(serde::Serialize)]
struct InspectColumn {
    name: String,
    position: usize,
}
