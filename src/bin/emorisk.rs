//! emorisk CLI - Command-line interface for Emotion Risk
//!
//! Commands:
//! - analyze: Analyze an emotion workbook and print the risk report
//! - inspect: Show how a workbook's sheets and columns are recognized
//! - doctor: Diagnose configuration and environment
//! - rules: Print the risk rule table

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use emotion_risk::adapters::{RAW_EVENT_COLUMNS, SUMMARY_COLUMNS};
use emotion_risk::columns::{locate_header, resolve_column};
use emotion_risk::risk::{MOOD_DISORDER_RULE, RISK_RULES};
use emotion_risk::{
    open_path, render_text, AnalysisConfig, AnalysisError, EmotionAnalyzer, ReportEncoder,
    PRODUCER_NAME, VERSION,
};

/// emorisk - Health risk screening from facial emotion detection exports
#[derive(Parser)]
#[command(name = "emorisk")]
#[command(version = VERSION)]
#[command(about = "Infer heuristic health risks from emotion detection spreadsheets", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workbook and print the risk report
    Analyze {
        /// Input workbook (.xlsx or .xls)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (defaults to text on a terminal, JSON otherwise)
        #[arg(long)]
        format: Option<ReportFormat>,

        /// Analysis configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show sheets, columns and detected headers of a workbook
    Inspect {
        /// Input workbook
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the risk rule table
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable text
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<(), EmoriskCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
            config,
        } => cmd_analyze(&input, output.as_deref(), format, config.as_deref()),

        Commands::Inspect {
            input,
            config,
            json,
        } => cmd_inspect(&input, config.as_deref(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Rules { json } => cmd_rules(json),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, EmoriskCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_path(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    format: Option<ReportFormat>,
    config: Option<&Path>,
) -> Result<(), EmoriskCliError> {
    let analyzer = EmotionAnalyzer::with_config(load_config(config)?);
    let result = analyzer.analyze_path(input)?;

    let source = input.file_name().map(|name| name.to_string_lossy());
    let report = ReportEncoder::new().encode(&result, source.as_deref());

    let format = format.unwrap_or_else(|| {
        if output.is_none() && atty::is(atty::Stream::Stdout) {
            ReportFormat::Text
        } else {
            ReportFormat::Json
        }
    });

    let output_data = match format {
        ReportFormat::Json => serde_json::to_string(&report)? + "\n",
        ReportFormat::JsonPretty => serde_json::to_string_pretty(&report)? + "\n",
        ReportFormat::Text => render_text(&report),
    };

    match output {
        Some(path) => fs::write(path, output_data)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output_data.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn cmd_inspect(input: &Path, config: Option<&Path>, json: bool) -> Result<(), EmoriskCliError> {
    let config = load_config(config)?;
    let workbook = open_path(input, &config)?;

    let sheets: Vec<SheetInspection> = workbook
        .sheets()
        .iter()
        .enumerate()
        .map(|(position, sheet)| {
            let table = sheet.table(0).ok();
            let columns = table
                .as_ref()
                .map(|table| table.found_columns())
                .unwrap_or_default();

            // Only the first sheet is ever read as raw events
            let raw_event_columns = match (&table, position) {
                (Some(table), 0) => RAW_EVENT_COLUMNS
                    .iter()
                    .map(|logical| ColumnMatch {
                        logical: logical.to_string(),
                        label: resolve_column(table, logical).map(|c| c.label),
                    })
                    .collect(),
                _ => Vec::new(),
            };

            let summary_header_row = if sheet.name() == config.summary_sheet {
                locate_header(sheet, &SUMMARY_COLUMNS, config.header_scan_rows).map(|m| m.row)
            } else {
                None
            };

            SheetInspection {
                name: sheet.name().to_string(),
                rows: sheet.row_count(),
                columns,
                raw_event_columns,
                summary_header_row,
            }
        })
        .collect();

    let report = InspectReport {
        file: workbook.source().unwrap_or_default().to_string(),
        summary_sheet: config.summary_sheet.clone(),
        sheets,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Workbook: {}", report.file);
        for sheet in &report.sheets {
            println!("\nSheet '{}' ({} rows)", sheet.name, sheet.rows);
            println!("  Columns: {}", sheet.columns.join(", "));
            if !sheet.raw_event_columns.is_empty() {
                println!("  Raw event columns:");
                for column in &sheet.raw_event_columns {
                    match &column.label {
                        Some(label) => println!("    {:<12} -> {}", column.logical, label),
                        None => println!("    {:<12} -> (missing)", column.logical),
                    }
                }
            }
            if sheet.name == report.summary_sheet {
                match sheet.summary_header_row {
                    Some(row) => println!("  Summary header at row {}", row + 1),
                    None => println!(
                        "  Summary header not found within {} rows",
                        config.header_scan_rows
                    ),
                }
            }
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), EmoriskCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, VERSION),
    });

    let effective = match config {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, using defaults".to_string(),
            });
            AnalysisConfig::default()
        }
        Some(path) => match AnalysisConfig::from_path(path) {
            Ok(loaded) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: "Config file valid".to_string(),
                });
                loaded
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                AnalysisConfig::default()
            }
        },
        None => AnalysisConfig::default(),
    };

    checks.push(DoctorCheck {
        name: "inputs".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Accepting .{} up to {} bytes; summary sheet '{}'",
            effective.allowed_extensions.join(", ."),
            effective.max_file_bytes,
            effective.summary_sheet
        ),
    });

    let tty = |stream: atty::Stream, name: &str| DoctorCheck {
        name: name.to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(stream) {
            format!("{name} is a TTY")
        } else {
            format!("{name} is redirected")
        },
    };
    checks.push(tty(atty::Stream::Stdin, "stdin"));
    checks.push(tty(atty::Stream::Stdout, "stdout"));

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("emorisk Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(EmoriskCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_rules(json: bool) -> Result<(), EmoriskCliError> {
    let mut rules: Vec<RuleEntry> = RISK_RULES
        .iter()
        .map(|rule| RuleEntry {
            risk: rule.risk.to_string(),
            condition: rule.trigger.describe(),
            base: rule.base,
            cap: rule.cap,
            suggestions: rule.suggestions.to_string(),
        })
        .collect();
    rules.push(RuleEntry {
        risk: MOOD_DISORDER_RULE.risk.to_string(),
        condition: format!("volatility > {}", MOOD_DISORDER_RULE.threshold),
        base: MOOD_DISORDER_RULE.base,
        cap: MOOD_DISORDER_RULE.cap,
        suggestions: MOOD_DISORDER_RULE.suggestions.to_string(),
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        println!("Risk rules (likelihood = min(cap, base + excess))");
        println!();
        for rule in &rules {
            println!(
                "  {:<22} {:<45} base {:>4} cap {:>4}",
                rule.risk, rule.condition, rule.base, rule.cap
            );
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum EmoriskCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for EmoriskCliError {
    fn from(e: io::Error) -> Self {
        EmoriskCliError::Io(e)
    }
}

impl From<AnalysisError> for EmoriskCliError {
    fn from(e: AnalysisError) -> Self {
        EmoriskCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for EmoriskCliError {
    fn from(e: serde_json::Error) -> Self {
        EmoriskCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EmoriskCliError> for CliError {
    fn from(e: EmoriskCliError) -> Self {
        match e {
            EmoriskCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EmoriskCliError::Analysis(e) => CliError {
                code: e.code().to_string(),
                hint: analysis_hint(&e).map(str::to_string),
                message: e.to_string(),
            },
            EmoriskCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            EmoriskCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn analysis_hint(e: &AnalysisError) -> Option<&'static str> {
    match e {
        AnalysisError::MissingColumns { .. }
        | AnalysisError::HeaderNotFound { .. }
        | AnalysisError::HeaderOutOfRange { .. } => Some(
            "Expected raw events (Session ID, Timestamp, Emotion, Confidence) on the first sheet \
             or an 'Emotion Summary' sheet with Emotion and Average (%); run 'emorisk inspect'",
        ),
        AnalysisError::TimestampParse(_) => {
            Some("Use ISO dates such as 2024-01-15 10:30:00 in the Timestamp column")
        }
        AnalysisError::UnsupportedExtension(_) => {
            Some("Add the extension to allowed_extensions in the config")
        }
        AnalysisError::FileTooLarge { .. } => Some("Raise max_file_bytes in the config"),
        AnalysisError::Io(_) => Some("Check file paths and permissions"),
        AnalysisError::Json(_) | AnalysisError::Config(_) => {
            Some("Run 'emorisk doctor --config <file>' to check the configuration")
        }
        _ => None,
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    file: String,
    summary_sheet: String,
    sheets: Vec<SheetInspection>,
}

#[derive(serde::Serialize)]
struct SheetInspection {
    name: String,
    rows: usize,
    columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    raw_event_columns: Vec<ColumnMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary_header_row: Option<usize>,
}

#[derive(serde::Serialize)]
struct ColumnMatch {
    logical: String,
    label: Option<String>,
}

#[derive(serde::Serialize)]
struct RuleEntry {
    risk: String,
    condition: String,
    base: f64,
    cap: f64,
    suggestions: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
