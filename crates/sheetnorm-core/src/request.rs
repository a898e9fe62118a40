use std::path::PathBuf;

use serde_json::{Map, Value};
use sheetnorm_model::INPUT_SHEETS_METADATA_KEY;
use sheetnorm_telemetry::TelemetryConfig;

use crate::error::EngineError;

/// Everything needed to prepare one job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub jobs_root: PathBuf,
    pub manifest_path: PathBuf,
    pub job_id: String,
    /// Seeds `JobContext.metadata`.
    pub metadata: Map<String, Value>,
    pub safe_mode: bool,
    pub telemetry: TelemetryConfig,
}

impl JobRequest {
    pub fn new(
        jobs_root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        job_id: impl Into<String>,
    ) -> Self {
        Self {
            jobs_root: jobs_root.into(),
            manifest_path: manifest_path.into(),
            job_id: job_id.into(),
            metadata: Map::new(),
            safe_mode: false,
            telemetry: TelemetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Restricts workbook inputs to the named sheets; empty means no filter.
    #[must_use]
    pub fn with_input_sheets(mut self, sheets: Vec<String>) -> Self {
        if !sheets.is_empty() {
            let names = sheets.into_iter().map(Value::String).collect();
            self.metadata
                .insert(INPUT_SHEETS_METADATA_KEY.to_string(), Value::Array(names));
        }
        self
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// A job id becomes a directory name under the jobs root.
pub(crate) fn check_job_id(job_id: &str) -> Result<(), EngineError> {
    let reason = if job_id.trim().is_empty() {
        Some("must not be empty")
    } else if job_id == "." || job_id == ".." {
        Some("must not be a relative directory")
    } else if job_id.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(EngineError::InvalidJobId {
            job_id: job_id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_must_be_plain_names() {
        assert!(check_job_id("2024-06-01_contacts").is_ok());
        for bad in ["", "  ", "..", "a/b", r"a\b"] {
            assert!(check_job_id(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn empty_sheet_list_sets_no_filter() {
        let request = JobRequest::new("jobs", "manifest.json", "job").with_input_sheets(Vec::new());
        assert!(!request.metadata.contains_key(INPUT_SHEETS_METADATA_KEY));
        let request = request.with_input_sheets(vec!["Members".into()]);
        assert_eq!(
            request.metadata[INPUT_SHEETS_METADATA_KEY],
            serde_json::json!(["Members"])
        );
    }
}
