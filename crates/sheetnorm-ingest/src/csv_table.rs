use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::header::{is_blank_row, split_header};
use crate::table::RawTable;

fn normalize_cell(raw: &str) -> Value {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

/// 1-based line on which the record at byte `offset` starts.
///
/// The reader reports a record's position before skipping the empty lines
/// in front of it, so line breaks at `offset` are stepped over first.
fn record_line(content: &[u8], offset: usize) -> usize {
    let start = content[offset.min(content.len())..]
        .iter()
        .position(|byte| !matches!(byte, b'\r' | b'\n'))
        .map_or(content.len(), |skip| offset + skip);
    1 + content[..start].iter().filter(|byte| **byte == b'\n').count()
}

/// Reads a CSV file as a single table named after the file.
///
/// Blank lines are skipped and the first remaining row is the header. Each
/// data row keeps the line it started on. Empty cells become null.
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    let content = fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_slice());

    let mut raw_rows: Vec<(usize, Vec<Value>)> = Vec::new();
    for (ordinal, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row: Vec<Value> = record.iter().map(normalize_cell).collect();
        if is_blank_row(&row) {
            continue;
        }
        let line = record.position().map_or(ordinal + 1, |pos| {
            record_line(&content, usize::try_from(pos.byte()).unwrap_or(usize::MAX))
        });
        raw_rows.push((line, row));
    }

    let split = split_header(raw_rows);
    debug!(
        path = %path.display(),
        columns = split.headers.len(),
        rows = split.rows.len(),
        header_row_number = split.header_row_number,
        "csv table read"
    );
    Ok(RawTable {
        source_file: file_name(path),
        source_sheet: None,
        headers: split.headers,
        rows: split.rows,
        row_numbers: split.row_numbers,
        header_row_number: split.header_row_number,
    })
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cells_are_trimmed_and_blank_is_null() {
        assert_eq!(normalize_cell("  x "), json!("x"));
        assert_eq!(normalize_cell("   "), Value::Null);
        assert_eq!(normalize_cell("\u{feff}id"), json!("id"));
    }

    #[test]
    fn record_lines_skip_leading_breaks() {
        let content = b"\n\r\nName\nAda\n";
        assert_eq!(record_line(content, 0), 3);
        assert_eq!(record_line(content, 3), 3);
        assert_eq!(record_line(content, 8), 4);
        assert_eq!(record_line(content, 99), 5);
    }
}
