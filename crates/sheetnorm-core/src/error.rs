use std::path::PathBuf;

use sheetnorm_ingest::IngestError;
use sheetnorm_map::MappingError;
use sheetnorm_model::{ManifestError, PipelinePhase};
use sheetnorm_normalize::NormalizeError;
use sheetnorm_output::OutputError;
use sheetnorm_plugins::{HookError, PluginError};
use sheetnorm_telemetry::TelemetryError;
use thiserror::Error;

/// Failures while a prepared job runs; each one fails the job.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline transition {from} -> {to}")]
    InvalidTransition {
        from: PipelinePhase,
        to: PipelinePhase,
    },

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),

    #[error("mapping {table}: {source}")]
    Mapping {
        table: String,
        #[source]
        source: MappingError,
    },

    #[error("normalizing {table}: {source}")]
    Normalize {
        table: String,
        #[source]
        source: NormalizeError,
    },

    #[error("output: {0}")]
    Output(#[from] OutputError),

    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Failures before any job work starts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid job id '{job_id}': {reason}")]
    InvalidJobId { job_id: String, reason: &'static str },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("plugin: {0}")]
    Plugin(#[from] PluginError),

    #[error("hook: {0}")]
    Hook(#[from] HookError),

    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("failed to create job directory {path}: {source}")]
    JobDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
