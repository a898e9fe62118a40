//! Workbook inputs (xlsx, xlsm, xls, ods) via calamine.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::{Number, Value};
use tracing::debug;

use crate::csv_table::file_name;
use crate::error::{IngestError, Result};
use crate::header::{is_blank_row, split_header};
use crate::table::RawTable;

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
        Data::Int(int) => Value::from(*int),
        Data::Float(float) => float_value(*float),
        Data::Bool(flag) => Value::Bool(*flag),
        // Serial date numbers; date plugins understand them.
        Data::DateTime(datetime) => float_value(datetime.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Value::String(text.clone()),
        Data::Error(_) => Value::String(cell.to_string()),
    }
}

fn float_value(float: f64) -> Value {
    if float.fract() == 0.0 && float.abs() < 9.0e15 {
        return Value::from(float as i64);
    }
    Number::from_f64(float).map_or(Value::Null, Value::Number)
}

/// Sheets to read, in workbook order.
///
/// Without a filter every sheet is read. A filter that names no sheet of
/// this workbook is an error; names it does not contain are skipped.
fn select_sheets(path: &Path, available: Vec<String>, filter: Option<&[String]>) -> Result<Vec<String>> {
    let Some(filter) = filter else {
        return Ok(available);
    };
    let selected: Vec<String> = available
        .iter()
        .filter(|name| filter.iter().any(|wanted| wanted == *name))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(IngestError::SheetFilterUnmatched {
            path: path.to_path_buf(),
            requested: filter.to_vec(),
            available,
        });
    }
    for wanted in filter {
        if !selected.contains(wanted) {
            debug!(path = %path.display(), sheet = %wanted, "requested sheet not in workbook");
        }
    }
    Ok(selected)
}

/// Reads every selected worksheet as its own table. Empty sheets are skipped.
pub fn read_workbook_tables(path: &Path, filter: Option<&[String]>) -> Result<Vec<RawTable>> {
    let mut workbook = open_workbook_auto(path).map_err(|source| IngestError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;
    let sheets = select_sheets(path, workbook.sheet_names(), filter)?;

    let mut tables = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|source| IngestError::Sheet {
                path: path.to_path_buf(),
                sheet: sheet.clone(),
                source,
            })?;
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        let raw_rows: Vec<(usize, Vec<Value>)> = range
            .rows()
            .enumerate()
            .map(|(idx, row)| (first_row + idx + 1, row.iter().map(cell_value).collect::<Vec<_>>()))
            .filter(|(_, row)| !is_blank_row(row))
            .collect();
        if raw_rows.is_empty() {
            debug!(path = %path.display(), sheet = %sheet, "empty sheet skipped");
            continue;
        }
        let split = split_header(raw_rows);
        debug!(
            path = %path.display(),
            sheet = %sheet,
            columns = split.headers.len(),
            rows = split.rows.len(),
            header_row_number = split.header_row_number,
            "worksheet read"
        );
        tables.push(RawTable {
            source_file: file_name(path),
            source_sheet: Some(sheet),
            headers: split.headers,
            rows: split.rows,
            row_numbers: split.row_numbers,
            header_row_number: split.header_row_number,
        });
    }
    Ok(tables)
}
