//! Wearwire CLI - Command-line interface for Wearwire
//!
//! Commands:
//! - decode: Decode a single hex-encoded frame
//! - replay: Feed captured frame records through a processor
//! - stats: Descriptive statistics over a numeric series
//! - doctor: Diagnose configuration and persisted windows

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use wearwire::encoder::TelemetrySnapshot;
use wearwire::record::{self, FrameRecord};
use wearwire::stats::{self, Correlation};
use wearwire::types::Reading;
use wearwire::{
    decode_frame_to_json, ProcessorConfig, TelemetryError, TelemetryProcessor, PRODUCER_NAME,
    WEARWIRE_VERSION,
};

/// Wearwire - On-device decoder for Bluetooth health-device telemetry
#[derive(Parser)]
#[command(name = "wearwire")]
#[command(version = WEARWIRE_VERSION)]
#[command(about = "Decode wearable GATT frames and summarize readings", long_about = None)]
struct Cli {
    /// Default log filter when RUST_LOG is unset (logs go to stderr)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single hex-encoded frame
    Decode {
        /// Characteristic name, short assigned number (2a37) or full UUID
        #[arg(short, long)]
        characteristic: String,

        /// Frame payload as hex
        payload_hex: String,

        /// Device ID to stamp on the reading
        #[arg(long, default_value = "unknown")]
        device_id: String,
    },

    /// Feed captured frame records through a processor
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Processor configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the rolling window size
        #[arg(long)]
        window_size: Option<usize>,

        /// Only emit per-device snapshots, not individual readings
        #[arg(long)]
        snapshots_only: bool,

        /// Load windows from file
        #[arg(long)]
        load_windows: Option<PathBuf>,

        /// Save windows to file after processing
        #[arg(long)]
        save_windows: Option<PathBuf>,
    },

    /// Descriptive statistics over a numeric series
    Stats {
        /// Input file path (use - for stdin) containing {"x": [...], "y": [...]}
        #[arg(short, long)]
        input: PathBuf,

        /// Correlation significance threshold
        #[arg(long, default_value_t = stats::SIGNIFICANCE_THRESHOLD)]
        threshold: f64,
    },

    /// Diagnose configuration and persisted windows
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a windows file
        #[arg(long)]
        windows: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame record per line)
    Ndjson,
    /// JSON array of frame records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Single JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

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

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), WearwireCliError> {
    match cli.command {
        Commands::Decode {
            characteristic,
            payload_hex,
            device_id,
        } => {
            let json = decode_frame_to_json(&characteristic, &payload_hex, &device_id)?;
            println!("{}", json);
            Ok(())
        }

        Commands::Replay {
            input,
            input_format,
            output_format,
            config,
            window_size,
            snapshots_only,
            load_windows,
            save_windows,
        } => cmd_replay(
            &input,
            input_format,
            output_format,
            config.as_deref(),
            window_size,
            snapshots_only,
            load_windows.as_deref(),
            save_windows.as_deref(),
        ),

        Commands::Stats { input, threshold } => cmd_stats(&input, threshold),

        Commands::Doctor {
            config,
            windows,
            json,
        } => cmd_doctor(config.as_deref(), windows.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, WearwireCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_replay(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    window_size: Option<usize>,
    snapshots_only: bool,
    load_windows: Option<&Path>,
    save_windows: Option<&Path>,
) -> Result<(), WearwireCliError> {
    let mut config = match config {
        Some(path) => ProcessorConfig::from_file(path)?,
        None => ProcessorConfig::default(),
    };
    if let Some(size) = window_size {
        config = config.with_window_size(size);
    }
    let mut processor = TelemetryProcessor::with_config(config)?;

    if let Some(path) = load_windows {
        let windows_json = fs::read_to_string(path)?;
        processor.load_windows(&windows_json)?;
    }

    let input_data = read_input(input)?;
    let records: Vec<FrameRecord> = match input_format {
        InputFormat::Ndjson => record::parse_ndjson(&input_data)?,
        InputFormat::Json => record::parse_array(&input_data)?,
    };

    if records.is_empty() {
        return Err(WearwireCliError::NoFrames);
    }

    let mut readings = Vec::new();
    for frame in &records {
        if let Some(reading) = processor.ingest_record(frame) {
            readings.push(reading);
        }
    }

    if let Some(path) = save_windows {
        fs::write(path, processor.save_windows()?)?;
    }

    let report = ReplayReport {
        decoded_frames: processor.decoded_frames(),
        dropped_frames: processor.dropped_frames(),
        readings: if snapshots_only { Vec::new() } else { readings },
        snapshots: processor.snapshots(),
    };

    print!("{}", format_report(&report, &output_format)?);
    Ok(())
}

fn format_report(report: &ReplayReport, format: &OutputFormat) -> Result<String, WearwireCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for reading in &report.readings {
                lines.push(serde_json::to_string(reading)?);
            }
            for snapshot in &report.snapshots {
                lines.push(serde_json::to_string(snapshot)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

fn cmd_stats(input: &Path, threshold: f64) -> Result<(), WearwireCliError> {
    let series: SeriesInput = serde_json::from_str(&read_input(input)?)?;

    let correlation = series
        .y
        .as_ref()
        .map(|y| Correlation::compute(&series.x, y, threshold));

    let report = StatsReport {
        count: series.x.len(),
        mean: stats::average(&series.x),
        std_dev: stats::standard_deviation(&series.x),
        correlation,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    windows: Option<&Path>,
    json: bool,
) -> Result<(), WearwireCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "wearwire_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Wearwire version {}", WEARWIRE_VERSION),
    });

    if let Some(config_path) = config {
        checks.push(match ProcessorConfig::from_file(config_path) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (window_size {}, threshold {})",
                    config.window_size, config.significance_threshold
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", e),
            },
        });
    }

    if let Some(windows_path) = windows {
        if windows_path.exists() {
            let mut processor = TelemetryProcessor::new();
            let check = match fs::read_to_string(windows_path) {
                Ok(content) => match processor.load_windows(&content) {
                    Ok(()) => DoctorCheck {
                        name: "windows".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Windows file valid ({} device(s))",
                            processor.window_count()
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "windows".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid windows JSON: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "windows".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read windows file: {}", e),
                },
            };
            checks.push(check);
        } else {
            checks.push(DoctorCheck {
                name: "windows".to_string(),
                status: CheckStatus::Warning,
                message: "Windows file does not exist".to_string(),
            });
        }
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (replay from - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: WEARWIRE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Wearwire Doctor Report");
        println!("======================");
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

    if report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error))
    {
        Err(WearwireCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum WearwireCliError {
    Io(io::Error),
    Telemetry(TelemetryError),
    Json(serde_json::Error),
    NoFrames,
    DoctorFailed,
}

impl From<io::Error> for WearwireCliError {
    fn from(e: io::Error) -> Self {
        WearwireCliError::Io(e)
    }
}

impl From<TelemetryError> for WearwireCliError {
    fn from(e: TelemetryError) -> Self {
        WearwireCliError::Telemetry(e)
    }
}

impl From<serde_json::Error> for WearwireCliError {
    fn from(e: serde_json::Error) -> Self {
        WearwireCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WearwireCliError> for CliError {
    fn from(e: WearwireCliError) -> Self {
        match e {
            WearwireCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WearwireCliError::Telemetry(TelemetryError::Decode(e)) => CliError {
                code: "DECODE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the payload length against the flags byte".to_string()),
            },
            WearwireCliError::Telemetry(e) => CliError {
                code: "TELEMETRY_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the frame record format".to_string()),
            },
            WearwireCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WearwireCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frame records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            WearwireCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Deserialize)]
struct SeriesInput {
    x: Vec<f64>,
    #[serde(default)]
    y: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct StatsReport {
    count: usize,
    mean: f64,
    std_dev: f64,
    correlation: Option<Correlation>,
}

#[derive(Serialize)]
struct ReplayReport {
    decoded_frames: u64,
    dropped_frames: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    readings: Vec<Reading>,
    snapshots: Vec<TelemetrySnapshot>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
