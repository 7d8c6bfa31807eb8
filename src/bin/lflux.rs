//! lflux CLI - Command-line interface for Lecture Flux
//!
//! Commands:
//! - extract: Compute features for every learner in an interaction log
//! - features: List the feature catalogue
//! - validate: Check which features an interaction log can feed

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lecture_flux::schema::EventTableAdapter;
use lecture_flux::types::{Column, CourseSchedule, Event};
use lecture_flux::{
    ComputeError, Feature, FeatureConfig, FeatureExtractor, FeatureReport, FEATURES_VERSION,
    PRODUCER_NAME,
};

/// lflux - Behavioral features from online-course video interaction logs
#[derive(Parser)]
#[command(name = "lflux")]
#[command(version = FEATURES_VERSION)]
#[command(about = "Compute behavioral features from video interaction logs", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "lecture_flux=trace"
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute features for every learner in the input
    Extract {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Course schedule (assigned videos per week, quizzes) as JSON
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// Engine configuration as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated feature codes or names (default: whole catalogue)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,
    },

    /// List the feature catalogue
    Features {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check which features each learner's log can feed
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Course schedule, to also check schedule-dependent features
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per learner)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

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

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Extract {
            input,
            output,
            input_format,
            output_format,
            schedule,
            config,
            features,
        } => cmd_extract(
            &input,
            &output,
            input_format,
            output_format,
            schedule.as_deref(),
            config.as_deref(),
            &features,
        ),
        Commands::Features { json } => cmd_features(json),
        Commands::Validate {
            input,
            input_format,
            schedule,
            json,
        } => cmd_validate(&input, input_format, schedule.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(FluxCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_events(input: &Path, input_format: InputFormat) -> Result<Vec<Event>, FluxCliError> {
    let input_data = read_input(input)?;
    let events = match input_format {
        InputFormat::Ndjson => EventTableAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => EventTableAdapter::parse_array(&input_data)?,
    };
    if events.is_empty() {
        return Err(FluxCliError::NoEvents);
    }
    Ok(events)
}

fn read_schedule(path: Option<&Path>) -> Result<Option<CourseSchedule>, FluxCliError> {
    path.map(|p| -> Result<CourseSchedule, FluxCliError> {
        let json = fs::read_to_string(p)?;
        Ok(CourseSchedule::from_json(&json)?)
    })
    .transpose()
}

fn build_extractor(
    schedule: Option<&Path>,
    config: Option<&Path>,
) -> Result<FeatureExtractor, FluxCliError> {
    let config = match config {
        Some(path) => FeatureConfig::from_json(&fs::read_to_string(path)?)?,
        None => FeatureConfig::default(),
    };
    let mut extractor = FeatureExtractor::with_config(config)?;
    if let Some(schedule) = read_schedule(schedule)? {
        extractor = extractor.with_schedule(schedule);
    }
    Ok(extractor)
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    schedule: Option<&Path>,
    config: Option<&Path>,
    features: &[String],
) -> Result<(), FluxCliError> {
    let extractor = build_extractor(schedule, config)?;
    let selected: Vec<Feature> = if features.is_empty() {
        Feature::ALL.to_vec()
    } else {
        features
            .iter()
            .map(|f| f.trim().parse::<Feature>())
            .collect::<Result<_, _>>()?
    };

    let events = read_events(input, input_format)?;
    let reports: Vec<FeatureReport> = EventTableAdapter::split_by_user(events)
        .values()
        .map(|table| extractor.extract(&selected, table))
        .collect();

    let output_data = format_output(&reports, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }
    Ok(())
}

fn format_output(
    reports: &[FeatureReport],
    output_format: &OutputFormat,
) -> Result<String, FluxCliError> {
    match output_format {
        OutputFormat::Ndjson => {
            let mut lines = String::new();
            for report in reports {
                lines.push_str(&serde_json::to_string(report)?);
                lines.push('\n');
            }
            Ok(lines)
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)? + "\n"),
    }
}

#[derive(serde::Serialize)]
struct CatalogueEntry {
    code: &'static str,
    name: &'static str,
    columns: Vec<&'static str>,
    needs_schedule: bool,
}

fn cmd_features(json: bool) -> Result<(), FluxCliError> {
    let entries: Vec<CatalogueEntry> = Feature::ALL
        .iter()
        .map(|f| CatalogueEntry {
            code: f.code(),
            name: f.name(),
            columns: f.required_columns().iter().map(Column::as_str).collect(),
            needs_schedule: f.needs_schedule(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} {} feature catalogue", PRODUCER_NAME, FEATURES_VERSION);
        println!();
        for entry in &entries {
            let schedule = if entry.needs_schedule { " [schedule]" } else { "" };
            println!(
                "  {:<4} {:<28} {}{}",
                entry.code,
                entry.name,
                entry.columns.join(", "),
                schedule
            );
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct ValidationReport {
    users: usize,
    total_events: usize,
    learners: Vec<LearnerValidation>,
}

#[derive(serde::Serialize)]
struct LearnerValidation {
    user_id: String,
    events: usize,
    available: usize,
    unavailable: Vec<UnavailableFeature>,
}

#[derive(serde::Serialize)]
struct UnavailableFeature {
    feature: &'static str,
    reason: String,
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    schedule: Option<&Path>,
    json: bool,
) -> Result<(), FluxCliError> {
    let mut extractor = FeatureExtractor::new();
    if let Some(schedule) = read_schedule(schedule)? {
        extractor = extractor.with_schedule(schedule);
    }

    let events = read_events(input, input_format)?;
    let total_events = events.len();
    let learners: Vec<LearnerValidation> = EventTableAdapter::split_by_user(events)
        .into_iter()
        .map(|(user_id, table)| {
            let unavailable: Vec<UnavailableFeature> = Feature::ALL
                .iter()
                .filter_map(|f| {
                    extractor.check(*f, &table).err().map(|e| UnavailableFeature {
                        feature: f.name(),
                        reason: e.to_string(),
                    })
                })
                .collect();
            LearnerValidation {
                user_id,
                events: table.len(),
                available: Feature::ALL.len() - unavailable.len(),
                unavailable,
            }
        })
        .collect();

    let report = ValidationReport {
        users: learners.len(),
        total_events,
        learners,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Learners:     {}", report.users);
        println!("Total events: {}", report.total_events);
        for learner in &report.learners {
            println!(
                "\n{} ({} events): {}/{} features available",
                learner.user_id,
                learner.events,
                learner.available,
                Feature::ALL.len()
            );
            for missing in &learner.unavailable {
                println!("  - {}: {}", missing.feature, missing.reason);
            }
        }
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoInput,
    NoEvents,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ComputeError> for FluxCliError {
    fn from(e: ComputeError) -> Self {
        FluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::ParseError(_) | ComputeError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure each event has event_type and timestamp")
                    }
                    ComputeError::UnknownFeature(_) => {
                        ("UNKNOWN_FEATURE", "Run 'lflux features' for the catalogue")
                    }
                    ComputeError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Check thresholds and utc_offset_minutes")
                    }
                    _ => ("COMPUTE_ERROR", "Run 'lflux validate' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, expected piped events".to_string(),
                hint: Some("Pipe a log into lflux or pass --input <file>".to_string()),
            },
            FluxCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}
