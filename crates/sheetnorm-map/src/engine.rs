//! Mapping engine implementation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetnorm_model::{ColumnMapping, ExtraColumn, JobContext, Manifest, ScoreContribution, TableInfo};
use sheetnorm_plugins::{ColumnRegistry, DetectorArgs, PluginState};
use tracing::{debug, trace};

use crate::error::{MappingError, Result};
use crate::sample::sample_column;
use crate::utils::{ExtraHeaders, normalize_header};

/// How every column of one table was resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMapping {
    /// In column order.
    pub mapped: Vec<ColumnMapping>,
    /// In column order.
    pub extras: Vec<ExtraColumn>,
    /// 0-based indices of columns neither mapped nor kept.
    pub dropped: Vec<usize>,
}

impl TableMapping {
    pub fn mapping_for(&self, field: &str) -> Option<&ColumnMapping> {
        self.mapped.iter().find(|m| m.field == field)
    }

    /// Required, enabled fields that no column was mapped to, in manifest order.
    pub fn missing_required<'m>(&self, manifest: &'m Manifest) -> Vec<&'m str> {
        manifest
            .eligible_fields()
            .filter(|(field, meta)| meta.required && self.mapping_for(field).is_none())
            .map(|(field, _)| field)
            .collect()
    }
}

/// Scores input columns against the loaded fields.
///
/// One column at a time, in index order: every detector of every loaded
/// module runs and the deltas are summed per field. The best unused field at
/// or above the threshold wins; ties go to the field earlier in
/// `columns.order`. Columns nobody scored fall back to label and synonym
/// matching, and whatever is still left becomes an extra column.
pub struct MappingEngine<'a> {
    registry: &'a ColumnRegistry,
    manifest: &'a Manifest,
    threshold: f64,
    sample_size: usize,
}

struct Scored {
    score: f64,
    position: usize,
}

impl<'a> MappingEngine<'a> {
    pub fn new(registry: &'a ColumnRegistry, manifest: &'a Manifest) -> Self {
        let defaults = manifest.defaults();
        Self {
            registry,
            manifest,
            threshold: defaults.mapping_score_threshold,
            sample_size: defaults.detector_sample_size,
        }
    }

    /// Maps `table`, whose values are given column-major in `columns`.
    pub fn map_table(
        &self,
        job: &JobContext,
        state: &mut PluginState,
        table: &TableInfo,
        columns: &[Vec<Value>],
    ) -> Result<TableMapping> {
        if columns.len() != table.headers.len() {
            return Err(MappingError::ShapeMismatch {
                table: table.source_file.clone(),
                headers: table.headers.len(),
                columns: columns.len(),
            });
        }
        let writer = self.manifest.writer();
        let mut extra_headers = ExtraHeaders::new(writer.unmapped_prefix.clone());
        let mut used: BTreeSet<String> = BTreeSet::new();
        let mut mapping = TableMapping::default();

        for (index, (raw_header, values)) in table.headers.iter().zip(columns).enumerate() {
            let header = normalize_header(raw_header);
            let (scores, contributions) =
                self.score_column(job, state, table, index, raw_header, &header, values)?;

            if let Some((field, score)) = self.best_candidate(&scores, &used) {
                debug!(column = index + 1, header = %raw_header, field = %field, score, "column mapped");
                used.insert(field.clone());
                mapping.mapped.push(ColumnMapping {
                    field,
                    header: raw_header.clone(),
                    index,
                    score,
                    contributions,
                    via_fallback: false,
                });
                continue;
            }

            if let Some(field) = self.fallback_field(&header, &used) {
                let score = scores.get(&field).map_or(0.0, |s| s.score);
                debug!(column = index + 1, header = %raw_header, field = %field, "column mapped by label/synonym");
                used.insert(field.clone());
                mapping.mapped.push(ColumnMapping {
                    field,
                    header: raw_header.clone(),
                    index,
                    score,
                    contributions,
                    via_fallback: true,
                });
                continue;
            }

            if writer.append_unmapped_columns {
                let output_header = extra_headers.allocate(raw_header, index + 1);
                debug!(column = index + 1, header = %raw_header, output_header = %output_header, "column kept as extra");
                mapping.extras.push(ExtraColumn {
                    header: raw_header.clone(),
                    index,
                    output_header,
                });
            } else {
                debug!(column = index + 1, header = %raw_header, "column dropped");
                mapping.dropped.push(index);
            }
        }
        Ok(mapping)
    }

    #[allow(clippy::too_many_arguments)]
    fn score_column(
        &self,
        job: &JobContext,
        state: &mut PluginState,
        table: &TableInfo,
        index: usize,
        raw_header: &str,
        header: &str,
        values: &[Value],
    ) -> Result<(BTreeMap<String, Scored>, Vec<ScoreContribution>)> {
        let sample = sample_column(values, self.sample_size);
        let mut scores: BTreeMap<String, Scored> = BTreeMap::new();
        let mut contributions = Vec::new();

        for module in self.registry.modules() {
            for detector in &module.detectors {
                let deltas = detector
                    .call(DetectorArgs {
                        job,
                        state: &mut *state,
                        field_name: &module.field,
                        field_meta: &module.meta,
                        header,
                        raw_header,
                        column_values_sample: &sample,
                        column_values: values,
                        table,
                        column_index: index + 1,
                    })
                    .map_err(|err| MappingError::Detector {
                        field: module.field.clone(),
                        detector: detector.id.clone(),
                        column_index: index + 1,
                        source: err.into(),
                    })?;

                for (field, delta) in deltas {
                    if delta == 0.0 {
                        continue;
                    }
                    if !delta.is_finite() {
                        debug!(detector = %detector.id, field = %field, "non-finite delta ignored");
                        continue;
                    }
                    let Some(position) = self.registry.position(&field) else {
                        debug!(detector = %detector.id, field = %field, "delta for unloaded field ignored");
                        continue;
                    };
                    trace!(column = index + 1, detector = %detector.id, field = %field, delta, "score delta");
                    scores
                        .entry(field.clone())
                        .or_insert(Scored {
                            score: 0.0,
                            position,
                        })
                        .score += delta;
                    contributions.push(ScoreContribution {
                        field,
                        detector: detector.id.clone(),
                        delta,
                    });
                }
            }
        }
        Ok((scores, contributions))
    }

    fn best_candidate(
        &self,
        scores: &BTreeMap<String, Scored>,
        used: &BTreeSet<String>,
    ) -> Option<(String, f64)> {
        scores
            .iter()
            .filter(|(field, s)| !used.contains(*field) && s.score > 0.0 && s.score >= self.threshold)
            .min_by(|(_, a), (_, b)| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then(a.position.cmp(&b.position))
            })
            .map(|(field, s)| (field.clone(), s.score))
    }

    fn fallback_field(&self, header: &str, used: &BTreeSet<String>) -> Option<String> {
        if header.is_empty() {
            return None;
        }
        self.manifest
            .eligible_fields()
            .filter(|(field, _)| !used.contains(*field))
            .find(|(field, meta)| {
                let label = meta.label.as_deref().unwrap_or(field);
                normalize_header(label) == header
                    || meta.synonyms.iter().any(|s| normalize_header(s) == header)
            })
            .map(|(field, _)| field.to_string())
    }
}
