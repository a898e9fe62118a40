//! Arguments handed to column callables.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sheetnorm_model::{CanonicalRow, ColumnMeta, JobContext, TableInfo};

/// Scratch space shared by every plugin call within one job.
pub type PluginState = Map<String, Value>;

/// Field id -> score delta returned by a detector.
pub type FieldScores = BTreeMap<String, f64>;

/// Scores for a single field.
pub fn score_for(field: &str, delta: f64) -> FieldScores {
    FieldScores::from([(field.to_string(), delta)])
}

pub struct DetectorArgs<'a> {
    pub job: &'a JobContext,
    pub state: &'a mut PluginState,
    pub field_name: &'a str,
    pub field_meta: &'a ColumnMeta,
    /// Trimmed, lowercased header.
    pub header: &'a str,
    pub raw_header: &'a str,
    pub column_values_sample: &'a [Value],
    pub column_values: &'a [Value],
    pub table: &'a TableInfo,
    /// 1-based.
    pub column_index: usize,
}

pub struct TransformArgs<'a> {
    pub job: &'a JobContext,
    pub state: &'a mut PluginState,
    pub field_name: &'a str,
    pub field_meta: &'a ColumnMeta,
    /// Current value of the field, taken from `row` before the call.
    pub value: Value,
    /// The row as accumulated so far; transformers may edit any field.
    pub row: &'a mut CanonicalRow,
    pub row_index: usize,
}

pub struct ValidateArgs<'a> {
    pub job: &'a JobContext,
    pub state: &'a mut PluginState,
    pub field_name: &'a str,
    pub field_meta: &'a ColumnMeta,
    pub value: &'a Value,
    pub row: &'a CanonicalRow,
    pub row_index: usize,
}
