//! Table-level results produced by mapping and normalization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::severity::Severity;

/// Canonical field id -> value for one row.
pub type CanonicalRow = BTreeMap<String, Value>;

/// Shape of an input table as seen by detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub source_file: String,
    /// Worksheet name for workbook inputs.
    #[serde(default)]
    pub source_sheet: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// 1-based row number of the header in the source.
    pub header_row_number: usize,
}

/// One detector's delta for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub field: String,
    /// `<script>:<callable>` of the detector that produced the delta.
    pub detector: String,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub field: String,
    pub header: String,
    /// 0-based position of the source column.
    pub index: usize,
    pub score: f64,
    /// Every non-zero delta produced for this column, in evaluation order.
    pub contributions: Vec<ScoreContribution>,
    /// True when the column was matched on label/synonym rather than score.
    #[serde(default)]
    pub via_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraColumn {
    pub header: String,
    pub index: usize,
    pub output_header: String,
}

/// Issue as returned by a validator; the engine fills in missing location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub row_index: Option<usize>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl IssueReport {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_row_index(mut self, row_index: usize) -> Self {
        self.row_index = Some(row_index);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A row-scoped business-rule violation. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_index: usize,
    pub field: String,
    pub code: String,
    pub severity: Severity,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ValidationIssue {
    pub fn from_report(report: IssueReport, row_index: usize, field: &str) -> Self {
        Self {
            row_index: report.row_index.unwrap_or(row_index),
            field: report.field.unwrap_or_else(|| field.to_string()),
            code: report.code,
            severity: report.severity.unwrap_or(Severity::Warning),
            message: report.message,
            details: report.details,
        }
    }
}

/// One normalized input table (file + sheet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileExtraction {
    pub source_file: String,
    #[serde(default)]
    pub source_sheet: Option<String>,
    /// Deduplicated output sheet name.
    pub sheet_name: String,
    pub mapped_columns: Vec<ColumnMapping>,
    pub extra_columns: Vec<ExtraColumn>,
    /// Canonical values in manifest order followed by extra values.
    pub rows: Vec<Vec<Value>>,
    pub header_row: Vec<String>,
    pub header_row_number: usize,
    pub validation_issues: Vec<ValidationIssue>,
}

impl FileExtraction {
    pub fn mapping_for(&self, field: &str) -> Option<&ColumnMapping> {
        self.mapped_columns.iter().find(|m| m.field == field)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn extra_headers(&self) -> impl Iterator<Item = &str> {
        self.extra_columns.iter().map(|e| e.output_header.as_str())
    }
}
