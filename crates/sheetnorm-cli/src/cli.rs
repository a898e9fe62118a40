//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use sheetnorm_model::Severity;

#[derive(Parser)]
#[command(
    name = "sheetnorm",
    version,
    about = "Normalize CSV and spreadsheet inputs against a column manifest",
    long_about = "Normalize CSV and spreadsheet inputs against a column manifest.\n\n\
                  Columns are matched to canonical fields by plugin detectors, rows are\n\
                  transformed and validated, and the result is written to a normalized\n\
                  workbook alongside a JSON artifact and an NDJSON event log."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a normalization job over `<JOBS_ROOT>/<JOB_ID>/input`.
    Run(RunArgs),

    /// Validate a manifest, bind its plugins and run its activation hooks.
    Check(CheckArgs),

    /// List the built-in script modules and their exports.
    Plugins,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Directory holding job directories.
    #[arg(long = "jobs-root", value_name = "DIR", env = "SHEETNORM_JOBS_ROOT")]
    pub jobs_root: PathBuf,

    /// Manifest describing the canonical columns.
    #[arg(long = "manifest", value_name = "FILE", env = "SHEETNORM_MANIFEST")]
    pub manifest: PathBuf,

    /// Job identifier (default: a random UUID).
    #[arg(long = "job-id", value_name = "ID")]
    pub job_id: Option<String>,

    /// Only read these workbook sheets (repeatable).
    #[arg(long = "input-sheet", value_name = "NAME")]
    pub input_sheets: Vec<String>,

    /// Correlation id attached to every note and event.
    #[arg(long = "correlation-id", value_name = "ID")]
    pub correlation_id: Option<String>,

    /// Extra event sink as `module:callable` (repeatable).
    #[arg(long = "event-sink", value_name = "SPEC")]
    pub event_sinks: Vec<String>,

    /// Skip lifecycle hooks; column plugins still run.
    #[arg(long = "safe-mode")]
    pub safe_mode: bool,

    /// Lowest severity recorded as an artifact note.
    #[arg(long = "note-level", value_name = "LEVEL")]
    pub note_level: Option<Severity>,

    /// Lowest severity sent to event sinks.
    #[arg(long = "event-level", value_name = "LEVEL")]
    pub event_level: Option<Severity>,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Manifest to check.
    #[arg(long = "manifest", value_name = "FILE", env = "SHEETNORM_MANIFEST")]
    pub manifest: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
