use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sheetnorm_core::{Activation, Engine, JobRequest};
use sheetnorm_model::JobResult;
use sheetnorm_plugins::builtin_package;
use sheetnorm_telemetry::{ArtifactDocument, TelemetryConfig};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::{CheckArgs, RunArgs};

/// A finished job plus its artifact, when the artifact could be read back.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: JobResult,
    pub artifact: Option<ArtifactDocument>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.result.is_success() { 0 } else { 1 }
    }
}

pub fn engine() -> Result<Engine> {
    let package = builtin_package().context("load built-in script package")?;
    Ok(Engine::new(package))
}

pub fn run_job(args: &RunArgs) -> Result<RunOutcome> {
    let telemetry = telemetry_config(args)?;
    let job_id = args
        .job_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let request = JobRequest::new(&args.jobs_root, &args.manifest, job_id)
        .with_input_sheets(args.input_sheets.clone())
        .with_safe_mode(args.safe_mode)
        .with_telemetry(telemetry);

    let result = engine()?
        .run_job(request)
        .with_context(|| format!("prepare job from {}", args.manifest.display()))?;
    info!(job_id = %result.job_id, status = %result.status, "run complete");

    let artifact = match read_artifact(&result.artifact_path) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!(error = %err, "artifact unavailable for summary");
            None
        }
    };
    Ok(RunOutcome { result, artifact })
}

pub fn check_manifest(args: &CheckArgs) -> Result<Activation> {
    engine()?
        .activate(&args.manifest)
        .with_context(|| format!("check manifest {}", args.manifest.display()))
}

/// Environment defaults with command line overrides on top.
pub fn telemetry_config(args: &RunArgs) -> Result<TelemetryConfig> {
    let mut config = TelemetryConfig::from_env()
        .context("read telemetry settings from the environment")?
        .with_correlation_id(args.correlation_id.clone());
    if let Some(level) = args.note_level {
        config = config.with_note_level(level);
    }
    if let Some(level) = args.event_level {
        config = config.with_event_level(level);
    }
    for spec in &args.event_sinks {
        config = config.with_sink_spec(spec);
    }
    Ok(config)
}

pub fn read_artifact(path: &Path) -> Result<ArtifactDocument> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read artifact {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse artifact {}", path.display()))
}
