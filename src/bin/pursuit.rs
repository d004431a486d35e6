//! Pursuit CLI - Command-line interface for the gaze pursuit engine
//!
//! Commands:
//! - replay: Replay a recorded gaze trace (batch mode)
//! - run: Classify trace events streamed on stdin (streaming mode)
//! - validate: Validate a gaze trace
//! - config: Print the effective detector configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gaze_pursuit::trace::{
    parse_array, parse_ndjson, parse_trace, validate_events, ReplayRecord, TraceEvent,
    TraceReplayer, TRACE_SCHEMA_VERSION,
};
use gaze_pursuit::{DetectorConfig, PursuitError, PRODUCER_NAME, VERSION};

/// Pursuit - Gaze pursuit classification for eye-driven controls
#[derive(Parser)]
#[command(name = "pursuit")]
#[command(version = VERSION)]
#[command(about = "Classify smooth-pursuit gaze traces into value-change events", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded gaze trace (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Detector configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only output samples that produced a direction event
        #[arg(long)]
        events_only: bool,
    },

    /// Classify trace events streamed on stdin (streaming mode)
    Run {
        /// Detector configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only output samples that produced a direction event
        #[arg(long)]
        events_only: bool,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate a gaze trace
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective detector configuration
    Config {
        /// Configuration file to merge over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line, then session summaries)
    Ndjson,
    /// Full replay report as JSON
    Json,
    /// Pretty-printed replay report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), PursuitCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            config,
            events_only,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            events_only,
        ),

        Commands::Run {
            config,
            events_only,
            flush,
        } => cmd_run(config.as_deref(), events_only, flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { config } => cmd_config(config.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    events_only: bool,
) -> Result<(), PursuitCliError> {
    let config = load_config(config)?;
    let input_data = read_input(input)?;
    let events = parse_events(&input_data, &input_format)?;

    if events.is_empty() {
        return Err(PursuitCliError::NoEvents);
    }

    let mut report = TraceReplayer::new(config)?.replay(&events)?;
    if events_only {
        report.records.retain(|r| r.direction.is_some());
    }

    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in &report.records {
                lines.push(serde_json::to_string(record)?);
            }
            for session in &report.sessions {
                lines.push(serde_json::to_string(session)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(config: Option<&Path>, events_only: bool, flush: bool) -> Result<(), PursuitCliError> {
    let config = load_config(config)?;
    let mut replayer = TraceReplayer::new(config)?;
    let mut sessions = Vec::new();
    let mut started = false;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: TraceEvent = serde_json::from_str(trimmed).map_err(|e| {
            PursuitCliError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
        })?;
        event
            .validate()
            .map_err(|reason| PursuitError::InvalidEvent {
                index: line_num,
                reason,
            })?;

        // Without an explicit start, the first gaze event starts the session
        if matches!(event, TraceEvent::Start) {
            started = true;
        } else if !started && event.feeds() {
            replayer.detector_mut().start();
            started = true;
        }

        let finished = sessions.len();
        if let Some(detection) = replayer.apply(&event, &mut sessions) {
            let record = ReplayRecord::from(&detection);
            if !events_only || record.direction.is_some() {
                writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
            }
        }
        for session in &sessions[finished..] {
            writeln!(stdout, "{}", serde_json::to_string(session)?)?;
        }
        if flush {
            stdout.flush()?;
        }
    }

    if let Some(summary) = replayer.detector_mut().stop() {
        writeln!(stdout, "{}", serde_json::to_string(&summary)?)?;
    }
    stdout.flush()?;

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PursuitCliError> {
    let input_data = read_input(input)?;
    let events = parse_events(&input_data, &input_format)?;
    let issues = validate_events(&events);

    let report = ValidationReport {
        schema_version: TRACE_SCHEMA_VERSION.to_string(),
        total_events: events.len(),
        valid_events: events.len() - issues.len(),
        invalid_events: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                event_type: issue.kind.clone(),
                error: issue.reason.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:         {}", report.schema_version);
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} event (index {}): {}", err.event_type, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(PursuitCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_config(config: Option<&Path>) -> Result<(), PursuitCliError> {
    let config = load_config(config)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), PursuitCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, VERSION),
    });

    checks.push(DoctorCheck {
        name: "trace_schema".to_string(),
        status: CheckStatus::Ok,
        message: format!("Trace schema: {}", TRACE_SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match DetectorConfig::from_json(&content) {
                    Ok(loaded) => {
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: CheckStatus::Ok,
                            message: format!(
                                "Config valid ({:?} mode, {} strategy, {}ms window)",
                                loaded.mode,
                                loaded.strategy.as_str(),
                                loaded.buffer_duration_ms
                            ),
                        });
                        let samples = loaded.buffer_duration_ms / loaded.sample_interval_ms;
                        if samples < 5 {
                            checks.push(DoctorCheck {
                                name: "window_samples".to_string(),
                                status: CheckStatus::Warning,
                                message: format!(
                                    "Window holds only {} samples; statistics will be noisy",
                                    samples
                                ),
                            });
                        }
                    }
                    Err(e) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            });
        }
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pursuit Doctor Report");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PursuitCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PursuitCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(input: &str, format: &InputFormat) -> Result<Vec<TraceEvent>, PursuitCliError> {
    let events = match format {
        InputFormat::Auto => parse_trace(input)?,
        InputFormat::Ndjson => parse_ndjson(input)?,
        InputFormat::Json => parse_array(input)?,
    };
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<DetectorConfig, PursuitCliError> {
    match path {
        Some(path) => Ok(DetectorConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(DetectorConfig::default()),
    }
}

// Error types

#[derive(Debug)]
enum PursuitCliError {
    Io(io::Error),
    Engine(PursuitError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for PursuitCliError {
    fn from(e: io::Error) -> Self {
        PursuitCliError::Io(e)
    }
}

impl From<PursuitError> for PursuitCliError {
    fn from(e: PursuitError) -> Self {
        PursuitCliError::Engine(e)
    }
}

impl From<serde_json::Error> for PursuitCliError {
    fn from(e: serde_json::Error) -> Self {
        PursuitCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PursuitCliError> for CliError {
    fn from(e: PursuitCliError) -> Self {
        match e {
            PursuitCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PursuitCliError::Engine(e) => {
                let (code, hint) = match &e {
                    PursuitError::InvalidConfig(_) => (
                        "CONFIG_ERROR",
                        "Run 'pursuit config' to see the default configuration",
                    ),
                    PursuitError::InvalidEvent { .. } => {
                        ("VALIDATION_ERROR", "Run 'pursuit validate' for details")
                    }
                    _ => ("PARSE_ERROR", "Ensure input matches the gaze.trace.v1 schema"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PursuitCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PursuitCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PursuitCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PursuitCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            PursuitCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_type: String,
    error: String,
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
