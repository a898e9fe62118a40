//! Core data model for sheetnorm: manifests, jobs, tables and results.

pub mod atomic;
pub mod error;
pub mod job;
pub mod manifest;
pub mod phase;
pub mod schema;
pub mod severity;
pub mod table;

pub use atomic::{AtomicWriteError, temp_path_for, write_atomic};
pub use error::{ManifestError, Result};
pub use job::{
    ARTIFACT_FILE_NAME, EVENTS_FILE_NAME, INPUT_SHEETS_METADATA_KEY, JobContext, JobPaths,
    JobResult, JobStatus, NORMALIZED_SHEETS_METADATA_KEY, OUTPUT_FILE_NAME,
};
pub use manifest::{
    ColumnMeta, ColumnsConfig, EngineConfig, EngineDefaults, HookConfig, HookRef, HookStage,
    LoadedManifest, MANIFEST_SCHEMA_PREFIX, Manifest, ManifestInfo, SCRIPT_API_VERSION,
    WriterConfig, WriterMode,
};
pub use phase::PipelinePhase;
pub use severity::{ParseSeverityError, Severity};
pub use table::{
    CanonicalRow, ColumnMapping, ExtraColumn, FileExtraction, IssueReport, ScoreContribution,
    TableInfo, ValidationIssue,
};
