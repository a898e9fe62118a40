//! Durable per-job summary written to `logs/artifact.json`.
//!
//! `start` persists an initial snapshot; everything afterwards is held in
//! memory until `flush`, which replaces the file atomically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sheetnorm_model::{FileExtraction, JobContext, Severity, ValidationIssue, write_atomic};
use tracing::debug;

use crate::error::{Result, TelemetryError};

pub const ARTIFACT_SCHEMA: &str = "sheetnorm.artifact/v1";
pub const ARTIFACT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    pub schema: String,
    pub artifact_version: String,
    pub job: ArtifactJob,
    pub config: ArtifactConfig,
    pub tables: Vec<TableSummary>,
    pub notes: Vec<ArtifactNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactJob {
    pub id: String,
    pub status: ArtifactStatus,
    pub started_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub schema: String,
    pub api_version: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub manifest_sha256: String,
    #[serde(default)]
    pub manifest_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactNote {
    pub timestamp: String,
    pub level: Severity,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedFieldSummary {
    pub field: String,
    pub header: String,
    pub index: usize,
    pub score: f64,
    pub via_fallback: bool,
}

/// What the artifact records about one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub source_file: String,
    #[serde(default)]
    pub source_sheet: Option<String>,
    pub sheet_name: String,
    pub header_row_number: usize,
    pub row_count: usize,
    pub mapped: Vec<MappedFieldSummary>,
    pub extras: Vec<String>,
    pub issue_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl TableSummary {
    pub fn from_extraction(extraction: &FileExtraction) -> Self {
        Self {
            source_file: extraction.source_file.clone(),
            source_sheet: extraction.source_sheet.clone(),
            sheet_name: extraction.sheet_name.clone(),
            header_row_number: extraction.header_row_number,
            row_count: extraction.row_count(),
            mapped: extraction
                .mapped_columns
                .iter()
                .map(|m| MappedFieldSummary {
                    field: m.field.clone(),
                    header: m.header.clone(),
                    index: m.index,
                    score: m.score,
                    via_fallback: m.via_fallback,
                })
                .collect(),
            extras: extraction.extra_headers().map(str::to_string).collect(),
            issue_count: extraction.validation_issues.len(),
            issues: extraction.validation_issues.clone(),
        }
    }
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Receives the durable job summary.
pub trait ArtifactSink {
    /// Initializes the summary for `job` and persists it.
    fn start(&mut self, job: &JobContext) -> Result<()>;

    fn note(&mut self, level: Severity, message: &str, details: Map<String, Value>);

    fn record_table(&mut self, table: TableSummary);

    fn mark_success(&mut self, outputs: &[PathBuf]);

    fn mark_failure(&mut self, error: &str);

    /// Persists the current summary.
    fn flush(&mut self) -> Result<()>;

    /// Current in-memory summary, if started.
    fn document(&self) -> Option<&ArtifactDocument>;
}

pub struct FileArtifactSink {
    path: PathBuf,
    document: Option<ArtifactDocument>,
}

impl FileArtifactSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document_mut(&mut self, operation: &str) -> Option<&mut ArtifactDocument> {
        if self.document.is_none() {
            debug!(operation, path = %self.path.display(), "artifact sink not started");
        }
        self.document.as_mut()
    }
}

impl ArtifactSink for FileArtifactSink {
    fn start(&mut self, job: &JobContext) -> Result<()> {
        let manifest = &job.manifest;
        self.document = Some(ArtifactDocument {
            schema: ARTIFACT_SCHEMA.to_string(),
            artifact_version: ARTIFACT_VERSION.to_string(),
            job: ArtifactJob {
                id: job.job_id.clone(),
                status: ArtifactStatus::Running,
                started_at: timestamp(job.started_at),
                completed_at: None,
                outputs: Vec::new(),
                error: None,
            },
            config: ArtifactConfig {
                schema: manifest.model.info.schema.clone(),
                api_version: manifest.model.config_script_api_version.clone(),
                title: manifest.model.info.title.clone(),
                version: manifest.model.info.version.clone(),
                manifest_sha256: manifest.sha256.clone(),
                manifest_path: manifest.path.as_ref().map(|p| p.display().to_string()),
            },
            tables: Vec::new(),
            notes: Vec::new(),
        });
        self.flush()
    }

    fn note(&mut self, level: Severity, message: &str, details: Map<String, Value>) {
        if let Some(document) = self.document_mut("note") {
            document.notes.push(ArtifactNote {
                timestamp: timestamp(Utc::now()),
                level,
                message: message.to_string(),
                details,
            });
        }
    }

    fn record_table(&mut self, table: TableSummary) {
        if let Some(document) = self.document_mut("record_table") {
            document.tables.push(table);
        }
    }

    fn mark_success(&mut self, outputs: &[PathBuf]) {
        if let Some(document) = self.document_mut("mark_success") {
            document.job.status = ArtifactStatus::Succeeded;
            document.job.completed_at = Some(timestamp(Utc::now()));
            document.job.outputs = outputs.iter().map(|p| p.display().to_string()).collect();
            document.job.error = None;
        }
    }

    fn mark_failure(&mut self, error: &str) {
        if let Some(document) = self.document_mut("mark_failure") {
            document.job.status = ArtifactStatus::Failed;
            document.job.completed_at = Some(timestamp(Utc::now()));
            document.job.outputs.clear();
            document.job.error = Some(error.to_string());
        }
    }

    fn flush(&mut self) -> Result<()> {
        let document = self.document.as_ref().ok_or(TelemetryError::NotStarted)?;
        let mut bytes = serde_json::to_vec_pretty(document).map_err(|source| {
            TelemetryError::Serialize {
                what: "artifact",
                source,
            }
        })?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)?;
        debug!(path = %self.path.display(), status = ?document.job.status, "artifact flushed");
        Ok(())
    }

    fn document(&self) -> Option<&ArtifactDocument> {
        self.document.as_ref()
    }
}
