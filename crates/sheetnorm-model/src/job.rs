//! Per-job context, directory layout and result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::manifest::{LoadedManifest, Manifest};

/// Metadata key carrying the caller's input sheet filter.
pub const INPUT_SHEETS_METADATA_KEY: &str = "input_sheet_names";
/// Metadata key under which in-memory writer output is retained.
pub const NORMALIZED_SHEETS_METADATA_KEY: &str = "normalized_sheets";

pub const ARTIFACT_FILE_NAME: &str = "artifact.json";
pub const EVENTS_FILE_NAME: &str = "events.ndjson";
pub const OUTPUT_FILE_NAME: &str = "normalized.xlsx";

/// `<jobs_root>/<job_id>/{input,output,logs}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub artifact_path: PathBuf,
    pub events_path: PathBuf,
    pub output_path: PathBuf,
}

impl JobPaths {
    pub fn new(jobs_root: &Path, job_id: &str) -> Self {
        let job_dir = jobs_root.join(job_id);
        let input_dir = job_dir.join("input");
        let output_dir = job_dir.join("output");
        let logs_dir = job_dir.join("logs");
        Self {
            artifact_path: logs_dir.join(ARTIFACT_FILE_NAME),
            events_path: logs_dir.join(EVENTS_FILE_NAME),
            output_path: output_dir.join(OUTPUT_FILE_NAME),
            job_dir,
            input_dir,
            output_dir,
            logs_dir,
        }
    }

    /// Creates the job directories if they are missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [&self.input_dir, &self.output_dir, &self.logs_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Mutable per-job state handed to every stage and hook.
///
/// Only `metadata` changes after preparation.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub manifest: Arc<LoadedManifest>,
    pub paths: JobPaths,
    pub started_at: DateTime<Utc>,
    pub safe_mode: bool,
    pub metadata: Map<String, Value>,
}

impl JobContext {
    pub fn new(job_id: impl Into<String>, manifest: Arc<LoadedManifest>, paths: JobPaths) -> Self {
        Self {
            job_id: job_id.into(),
            manifest,
            paths,
            started_at: Utc::now(),
            safe_mode: false,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest.model
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Sheet names the caller asked for, if a filter was supplied.
    pub fn input_sheet_filter(&self) -> Option<Vec<String>> {
        let names = self.metadata.get(INPUT_SHEETS_METADATA_KEY)?.as_array()?;
        let names: Vec<String> = names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    pub artifact_path: PathBuf,
    pub events_path: PathBuf,
    pub output_paths: Vec<PathBuf>,
    pub processed_files: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobResult {
    pub fn succeeded(
        job: &JobContext,
        output_paths: Vec<PathBuf>,
        processed_files: Vec<String>,
    ) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: JobStatus::Succeeded,
            artifact_path: job.paths.artifact_path.clone(),
            events_path: job.paths.events_path.clone(),
            output_paths,
            processed_files,
            error: None,
        }
    }

    pub fn failed(job: &JobContext, processed_files: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: JobStatus::Failed,
            artifact_path: job.paths.artifact_path.clone(),
            events_path: job.paths.events_path.clone(),
            output_paths: Vec::new(),
            processed_files,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}
