//! Row normalization: canonical rows, transformers, validators.

use serde_json::Value;
use sheetnorm_map::TableMapping;
use sheetnorm_model::{CanonicalRow, JobContext, Manifest, ValidationIssue};
use sheetnorm_plugins::{ColumnRegistry, PluginState, TransformArgs, ValidateArgs};
use tracing::{debug, trace};

use crate::error::{NormalizeError, Result};

/// Rows of one table after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRows {
    /// Canonical values in manifest order, then extra values.
    pub rows: Vec<Vec<Value>>,
    pub issues: Vec<ValidationIssue>,
}

pub struct NormalizationEngine<'a> {
    registry: &'a ColumnRegistry,
    manifest: &'a Manifest,
}

impl<'a> NormalizationEngine<'a> {
    pub fn new(registry: &'a ColumnRegistry, manifest: &'a Manifest) -> Self {
        Self { registry, manifest }
    }

    /// Normalizes every data row of a table.
    ///
    /// `row_numbers[i]` is the 1-based source row of `rows[i]` and becomes its
    /// `row_index`. Rows past the end of `row_numbers` continue the count from
    /// the last known number.
    pub fn normalize_table(
        &self,
        job: &JobContext,
        state: &mut PluginState,
        mapping: &TableMapping,
        rows: &[Vec<Value>],
        row_numbers: &[usize],
    ) -> Result<NormalizedRows> {
        let mut out = NormalizedRows {
            rows: Vec::with_capacity(rows.len()),
            issues: Vec::new(),
        };
        let mut row_index = 0;
        for (position, raw) in rows.iter().enumerate() {
            row_index = row_numbers.get(position).copied().unwrap_or(row_index + 1);
            let (row, issues) = self.normalize_row(job, state, mapping, raw, row_index)?;
            out.rows.push(row);
            out.issues.extend(issues);
        }
        debug!(
            rows = out.rows.len(),
            issues = out.issues.len(),
            "table normalized"
        );
        Ok(out)
    }

    /// Normalizes one raw row; `row_index` is its 1-based source row number.
    pub fn normalize_row(
        &self,
        job: &JobContext,
        state: &mut PluginState,
        mapping: &TableMapping,
        raw: &[Value],
        row_index: usize,
    ) -> Result<(Vec<Value>, Vec<ValidationIssue>)> {
        let mut canonical = self.canonical_row(mapping, raw);

        for module in self.registry.modules().iter().filter(|m| m.has_transformer()) {
            let value = canonical.get(&module.field).cloned().unwrap_or(Value::Null);
            let updates = module
                .transform(TransformArgs {
                    job,
                    state: &mut *state,
                    field_name: &module.field,
                    field_meta: &module.meta,
                    value,
                    row: &mut canonical,
                    row_index,
                })
                .map_err(|err| NormalizeError::Transformer {
                    field: module.field.clone(),
                    row_index,
                    source: err.into(),
                })?;
            if let Some(updates) = updates {
                trace!(field = %module.field, row_index, updated = updates.len(), "transformer updates");
                canonical.extend(updates);
            }
        }

        let mut issues = Vec::new();
        for module in self.registry.modules().iter().filter(|m| m.has_validator()) {
            let value = canonical.get(&module.field).cloned().unwrap_or(Value::Null);
            let reports = module
                .validate(ValidateArgs {
                    job,
                    state: &mut *state,
                    field_name: &module.field,
                    field_meta: &module.meta,
                    value: &value,
                    row: &canonical,
                    row_index,
                })
                .map_err(|err| NormalizeError::Validator {
                    field: module.field.clone(),
                    row_index,
                    source: err.into(),
                })?;
            issues.extend(
                reports
                    .into_iter()
                    .map(|report| ValidationIssue::from_report(report, row_index, &module.field)),
            );
        }

        let mut row: Vec<Value> = self
            .manifest
            .column_order()
            .iter()
            .map(|field| canonical.remove(field).unwrap_or(Value::Null))
            .collect();
        row.extend(
            mapping
                .extras
                .iter()
                .map(|extra| raw.get(extra.index).cloned().unwrap_or(Value::Null)),
        );
        Ok((row, issues))
    }

    /// Every `columns.order` field, valued from its mapped column or null.
    fn canonical_row(&self, mapping: &TableMapping, raw: &[Value]) -> CanonicalRow {
        self.manifest
            .column_order()
            .iter()
            .map(|field| {
                let value = mapping
                    .mapping_for(field)
                    .and_then(|m| raw.get(m.index))
                    .cloned()
                    .unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect()
    }
}
