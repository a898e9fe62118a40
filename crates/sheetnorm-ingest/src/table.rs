//! Raw input tables as read from disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetnorm_model::TableInfo;

/// One input table before mapping: a CSV file or a single worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// File name of the input, without directories.
    pub source_file: String,
    pub source_sheet: Option<String>,
    pub headers: Vec<String>,
    /// Data rows below the header, each padded or cut to `headers.len()`.
    pub rows: Vec<Vec<Value>>,
    /// 1-based source row number of each data row. Blank rows in the
    /// source leave gaps.
    #[serde(default)]
    pub row_numbers: Vec<usize>,
    /// 1-based row number of the header in the source.
    pub header_row_number: usize,
}

impl RawTable {
    pub fn info(&self) -> TableInfo {
        TableInfo {
            source_file: self.source_file.clone(),
            source_sheet: self.source_sheet.clone(),
            headers: self.headers.clone(),
            row_count: self.rows.len(),
            header_row_number: self.header_row_number,
        }
    }

    /// Values grouped per column, for detectors.
    pub fn columns(&self) -> Vec<Vec<Value>> {
        (0..self.headers.len())
            .map(|idx| {
                self.rows
                    .iter()
                    .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
