//! Flux CLI - Command-line interface for Author Flux
//!
//! Commands:
//! - features: Derive the per-author feature table
//! - time-stats: Compute only the posting-time statistics
//! - validate: Validate post records
//! - format-raw: Pretty-print raw platform records
//! - lexicon: Install and load the stopword lexicon
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use author_flux::adapters::{format_raw, TwitterStatusAdapter};
use author_flux::config::FeatureConfig;
use author_flux::encoder::FeatureEncoder;
use author_flux::lexical::{self, InstallStatus, Lexicon, STOPWORDS_FILE};
use author_flux::schema::{AuthorProfile, PostRecord, RecordAdapter, RecordFormat, SCHEMA_VERSION};
use author_flux::timing::unique_authors;
use author_flux::types::AuthorTimeStatistics;
use author_flux::{author_time_statistics, FeatureProcessor, FLUX_VERSION, PRODUCER_NAME};

/// Flux - Per-author behavioral feature engine for social-media posts
#[derive(Parser)]
#[command(name = "flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Derive per-author behavioral features from social-media posts", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// Settings file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language tag for ratios, bag-of-words, and time filtering
    #[arg(long)]
    language: Option<String>,

    /// Which posts enter the posting-time statistics
    #[arg(long, value_enum)]
    select: Option<Selection>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the per-author feature table
    Features {
        /// Posts file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Author profiles file; rows follow its order when given
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Emit bag-of-words as a single joined string
        #[arg(long)]
        joined_bow: bool,

        /// Use the installed stopword lexicon instead of the bundled list
        #[arg(long)]
        installed_lexicon: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Compute only the posting-time statistics
    TimeStats {
        /// Posts file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Validate post records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pretty-print raw platform records with sorted keys
    FormatRaw {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Install (if absent) and load the stopword lexicon
    Lexicon {
        /// Lexicon directory (defaults to the platform cache dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one post per line)
    Ndjson,
    /// JSON array of posts
    Json,
    /// CSV with a header row
    Csv,
    /// Raw Twitter v1.1 status payload
    Twitter,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON payload with producer metadata
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Flat CSV table
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum Selection {
    /// Posts tagged with the language only
    Matching,
    /// Posts not tagged with the language only
    NonMatching,
    /// Every post
    All,
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

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Features {
            input,
            profiles,
            output,
            input_format,
            output_format,
            joined_bow,
            installed_lexicon,
            selection,
        } => {
            let mut config = load_config(&selection)?;
            if joined_bow {
                config.bag_of_words_as_list = false;
            }
            cmd_features(
                &input,
                profiles.as_deref(),
                &output,
                input_format,
                output_format,
                installed_lexicon,
                config,
            )
        }

        Commands::TimeStats {
            input,
            input_format,
            output_format,
            selection,
        } => {
            let config = load_config(&selection)?;
            cmd_time_stats(&input, input_format, output_format, &config)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::FormatRaw { input } => {
            let raw = read_input(&input)?;
            println!("{}", format_raw(&raw)?);
            Ok(())
        }

        Commands::Lexicon { dir } => cmd_lexicon(dir.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(args: &SelectionArgs) -> Result<FeatureConfig, FluxCliError> {
    let mut config = match &args.config {
        Some(path) => FeatureConfig::from_json_file(path)?,
        None => FeatureConfig::default(),
    };

    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(selection) = args.select {
        let (matching, non_matching) = match selection {
            Selection::Matching => (true, false),
            Selection::NonMatching => (false, true),
            Selection::All => (true, true),
        };
        config.time_selection.include_matching = matching;
        config.time_selection.include_non_matching = non_matching;
    }

    // Fail on an unusable selection before reading any input
    config.validate()?;
    debug!(?config, "Resolved settings");
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), FluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

/// Posts plus any profiles embedded in the input
fn read_posts(
    input: &Path,
    format: InputFormat,
) -> Result<(Vec<PostRecord>, Vec<AuthorProfile>), FluxCliError> {
    let data = read_input(input)?;
    let parsed = match format {
        InputFormat::Ndjson => (RecordAdapter::parse_posts(&data, RecordFormat::Ndjson)?, Vec::new()),
        InputFormat::Json => (RecordAdapter::parse_posts(&data, RecordFormat::Json)?, Vec::new()),
        InputFormat::Csv => (RecordAdapter::parse_posts(&data, RecordFormat::Csv)?, Vec::new()),
        InputFormat::Twitter => TwitterStatusAdapter.parse_records(&data)?,
    };
    Ok(parsed)
}

fn read_profiles(path: &Path) -> Result<Vec<AuthorProfile>, FluxCliError> {
    let data = read_input(path)?;
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => RecordFormat::Csv,
        Some("json") => RecordFormat::Json,
        _ => RecordFormat::Ndjson,
    };
    Ok(RecordAdapter::parse_profiles(&data, format)?)
}

fn cmd_features(
    input: &Path,
    profiles: Option<&Path>,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    installed_lexicon: bool,
    config: FeatureConfig,
) -> Result<(), FluxCliError> {
    let (posts, embedded_authors) = read_posts(input, input_format)?;
    if posts.is_empty() {
        return Err(FluxCliError::NoPosts);
    }

    let authors = match profiles {
        Some(path) => read_profiles(path)?,
        None => embedded_authors,
    };

    let language = config.language.clone();
    let processor = if installed_lexicon {
        let lexicon = lexical::initialize(config.lexicon_dir.as_deref())?;
        FeatureProcessor::new(config).with_lexicon(lexicon)
    } else {
        FeatureProcessor::from_config(config)?
    };

    let table = processor.process(&posts, &authors)?;
    let encoder = processor.encoder();

    let output_data = match output_format {
        OutputFormat::Ndjson => encoder.encode_to_ndjson(&table)?,
        OutputFormat::Json => serde_json::to_string(&encoder.encode(&table, &language))?,
        OutputFormat::JsonPretty => encoder.encode_to_json(&table, &language)?,
        OutputFormat::Csv => encoder.encode_to_csv(&table)?,
    };

    write_output(output, &output_data)
}

fn cmd_time_stats(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: &FeatureConfig,
) -> Result<(), FluxCliError> {
    let (posts, embedded_authors) = read_posts(input, input_format)?;

    let author_ids: Vec<&str> = if embedded_authors.is_empty() {
        unique_authors(posts.iter().map(|p| p.author_id.as_str()))
    } else {
        embedded_authors.iter().map(|a| a.author_id.as_str()).collect()
    };

    let rows = author_time_statistics(
        &posts,
        author_ids,
        &config.language_selection(),
        &config.unset_timestamp,
    )?;

    print!("{}", format_time_rows(&rows, output_format)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), FluxCliError> {
    let (posts, _) = read_posts(input, input_format)?;

    let results = RecordAdapter::validate_posts(&posts);

    let report = ValidationReport {
        total_posts: posts.len(),
        valid_posts: posts.len() - results.len(),
        invalid_posts: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                post_id: r.post_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total posts:   {}", report.total_posts);
        println!("Valid posts:   {}", report.valid_posts);
        println!("Invalid posts: {}", report.invalid_posts);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Post {} (index {}): {}",
                    err.post_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_posts > 0 {
        Err(FluxCliError::ValidationFailed(report.invalid_posts))
    } else {
        Ok(())
    }
}

fn cmd_lexicon(dir: Option<&Path>) -> Result<(), FluxCliError> {
    let dir = dir.map(Path::to_path_buf).unwrap_or_else(lexical::default_lexicon_dir);
    let (path, status) = lexical::install(&dir)?;
    let lexicon = lexical::initialize(Some(&dir))?;

    let verb = match status {
        InstallStatus::Installed => "Installed",
        InstallStatus::AlreadyPresent => "Already present",
    };
    println!("{}: {} ({} stopwords)", verb, path.display(), lexicon.len());
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    // Check settings file if provided
    let mut lexicon_dir = None;
    if let Some(path) = config_path {
        let check = match FeatureConfig::from_json_file(path) {
            Ok(config) => match config.validate() {
                Ok(()) => {
                    lexicon_dir = config.lexicon_dir.clone();
                    DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Settings valid (language {})", config.language),
                    }
                }
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot load settings: {}", e),
            },
        };
        checks.push(check);
    }

    // Check the configured or installed lexicon without installing it
    checks.push(lexicon_check(lexicon_dir));

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
            message: "stdin is a pipe (use -i - to read posts from it)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flux Doctor Report");
        println!("==================");
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
        Err(FluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn lexicon_check(lexicon_dir: Option<PathBuf>) -> DoctorCheck {
    let configured = lexicon_dir.is_some();
    let lexicon_path = lexicon_dir
        .unwrap_or_else(lexical::default_lexicon_dir)
        .join(STOPWORDS_FILE);
    if lexicon_path.exists() {
        match Lexicon::load(&lexicon_path) {
            Ok(lexicon) => DoctorCheck {
                name: "lexicon".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} stopwords at {}", lexicon.len(), lexicon_path.display()),
            },
            Err(e) => DoctorCheck {
                name: "lexicon".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        }
    } else if configured {
        DoctorCheck {
            name: "lexicon".to_string(),
            status: CheckStatus::Error,
            message: format!("Configured lexicon {} not found", lexicon_path.display()),
        }
    } else {
        DoctorCheck {
            name: "lexicon".to_string(),
            status: CheckStatus::Warning,
            message: "Lexicon not installed; run 'flux lexicon' (bundled list is used meanwhile)".to_string(),
        }
    }
}

fn format_time_rows(
    rows: &[AuthorTimeStatistics],
    format: OutputFormat,
) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for row in rows {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => Ok(FeatureEncoder::new().encode_time_rows_to_csv(rows)?),
    }
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Feature(author_flux::FeatureError),
    Json(serde_json::Error),
    NoPosts,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<author_flux::FeatureError> for FluxCliError {
    fn from(e: author_flux::FeatureError) -> Self {
        FluxCliError::Feature(e)
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
            FluxCliError::Feature(author_flux::FeatureError::InvalidLanguageSelection) => CliError {
                code: "INVALID_SELECTION".to_string(),
                message: author_flux::FeatureError::InvalidLanguageSelection.to_string(),
                hint: Some("Pass --select matching, non-matching, or all".to_string()),
            },
            FluxCliError::Feature(e) => CliError {
                code: "FEATURE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the social.post_record.v1 schema".to_string()),
            },
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::NoPosts => CliError {
                code: "NO_POSTS".to_string(),
                message: "No posts found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} posts failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            FluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_posts: usize,
    valid_posts: usize,
    invalid_posts: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    post_id: Option<String>,
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
