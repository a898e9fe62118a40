//! Extraction stage: discover inputs, then map and normalize every table.

use std::time::Instant;

use serde_json::{Value, json};
use sheetnorm_ingest::{RawTable, list_input_files, read_input};
use sheetnorm_map::MappingEngine;
use sheetnorm_model::{FileExtraction, JobContext, Severity};
use sheetnorm_normalize::NormalizationEngine;
use sheetnorm_output::{SheetNameAllocator, table_sheet_base};
use sheetnorm_plugins::{ColumnRegistry, PluginState};
use sheetnorm_telemetry::{TableSummary, TelemetryBindings, payload};
use tracing::{debug, info, info_span};

use crate::error::{PipelineError, Result};

pub const TABLE_EXTRACTED_EVENT: &str = "table.extracted";
pub const VALIDATION_ISSUE_EVENT: &str = "validation.issue";

/// Reads, maps and normalizes every table found in the job's input directory.
///
/// Files are pushed onto `processed_files` as soon as they have been read, so
/// a failure part-way through still reports what was touched.
pub fn extract_tables(
    job: &JobContext,
    columns: &ColumnRegistry,
    state: &mut PluginState,
    telemetry: &mut TelemetryBindings,
    processed_files: &mut Vec<String>,
) -> Result<Vec<FileExtraction>> {
    let start = Instant::now();
    let files = list_input_files(&job.paths.input_dir)?;
    let filter = job.input_sheet_filter();
    debug!(files = files.len(), sheet_filter = ?filter, "inputs discovered");

    let mut sheet_names = SheetNameAllocator::new();
    let mut extractions = Vec::new();
    for file in &files {
        let tables = read_input(file, filter.as_deref())?;
        processed_files.push(file.file_name());
        for table in tables {
            let sheet_name =
                sheet_names.allocate(&table_sheet_base(&file.stem(), table.source_sheet.as_deref()));
            let span = info_span!("table", file = %table.source_file, sheet = %sheet_name);
            let extraction =
                span.in_scope(|| extract_table(job, columns, state, telemetry, table, sheet_name))?;
            extractions.push(extraction);
        }
    }
    info!(
        files = files.len(),
        tables = extractions.len(),
        duration_ms = start.elapsed().as_millis(),
        "extraction complete"
    );
    Ok(extractions)
}

fn table_label(table: &RawTable) -> String {
    match &table.source_sheet {
        Some(sheet) => format!("{}[{sheet}]", table.source_file),
        None => table.source_file.clone(),
    }
}

fn extract_table(
    job: &JobContext,
    columns: &ColumnRegistry,
    state: &mut PluginState,
    telemetry: &mut TelemetryBindings,
    table: RawTable,
    sheet_name: String,
) -> Result<FileExtraction> {
    let manifest = job.manifest();
    let info = table.info();
    let mapping = MappingEngine::new(columns, manifest)
        .map_table(job, state, &info, &table.columns())
        .map_err(|source| PipelineError::Mapping {
            table: table_label(&table),
            source,
        })?;

    for field in mapping.missing_required(manifest) {
        telemetry.note(
            Severity::Warning,
            &format!("required field '{field}' was not mapped"),
            payload(json!({
                "field": field,
                "source_file": table.source_file,
                "sheet_name": sheet_name,
            })),
        );
    }

    let normalized = NormalizationEngine::new(columns, manifest)
        .normalize_table(job, state, &mapping, &table.rows, &table.row_numbers)
        .map_err(|source| PipelineError::Normalize {
            table: table_label(&table),
            source,
        })?;

    let extraction = FileExtraction {
        source_file: table.source_file,
        source_sheet: table.source_sheet,
        sheet_name,
        mapped_columns: mapping.mapped,
        extra_columns: mapping.extras,
        rows: normalized.rows,
        header_row: table.headers,
        header_row_number: table.header_row_number,
        validation_issues: normalized.issues,
    };
    report_extraction(job, telemetry, &extraction);
    Ok(extraction)
}

fn report_extraction(job: &JobContext, telemetry: &mut TelemetryBindings, extraction: &FileExtraction) {
    telemetry.record_table(TableSummary::from_extraction(extraction));

    let mapped: Vec<Value> = extraction
        .mapped_columns
        .iter()
        .map(|m| json!({"field": m.field, "header": m.header, "score": m.score}))
        .collect();
    telemetry.emit(
        job,
        Severity::Info,
        TABLE_EXTRACTED_EVENT,
        payload(json!({
            "source_file": extraction.source_file,
            "source_sheet": extraction.source_sheet,
            "sheet_name": extraction.sheet_name,
            "row_count": extraction.row_count(),
            "mapped": mapped,
            "extras": extraction.extra_headers().collect::<Vec<_>>(),
            "issue_count": extraction.validation_issues.len(),
        })),
    );

    for issue in &extraction.validation_issues {
        telemetry.emit(
            job,
            Severity::Warning,
            VALIDATION_ISSUE_EVENT,
            payload(json!({
                "source_file": extraction.source_file,
                "sheet_name": extraction.sheet_name,
                "row_index": issue.row_index,
                "field": issue.field,
                "code": issue.code,
                "severity": issue.severity,
                "message": issue.message,
                "details": issue.details,
            })),
        );
    }

    info!(
        rows = extraction.row_count(),
        mapped = extraction.mapped_columns.len(),
        extras = extraction.extra_columns.len(),
        issues = extraction.validation_issues.len(),
        "table extracted"
    );
}
