//! Laying out normalized extractions as workbook sheets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetnorm_model::{FileExtraction, Manifest};

use crate::sheet_names::sanitize_sheet_name;

/// One sheet of the normalized workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetData {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SheetData {
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Builds the sheets for `extractions` according to the manifest writer
/// settings.
///
/// With `output_sheet` set and more than one extraction, every table lands
/// on one combined sheet. Otherwise each extraction gets its own sheet.
pub fn compose_sheets(manifest: &Manifest, extractions: &[FileExtraction]) -> Vec<SheetData> {
    let labels = manifest.labels();
    let output_sheet = manifest.writer().output_sheet.as_deref();
    match output_sheet {
        Some(name) if extractions.len() > 1 => {
            vec![combined_sheet(name, &labels, extractions)]
        }
        _ => extractions
            .iter()
            .map(|extraction| {
                let name = match output_sheet {
                    Some(name) => sanitize_sheet_name(name),
                    None => extraction.sheet_name.clone(),
                };
                let mut header = labels.clone();
                header.extend(extraction.extra_headers().map(str::to_string));
                SheetData {
                    name,
                    header,
                    rows: extraction.rows.clone(),
                }
            })
            .collect(),
    }
}

fn combined_sheet(name: &str, labels: &[String], extractions: &[FileExtraction]) -> SheetData {
    let mut extras: Vec<&str> = Vec::new();
    for header in extractions.iter().flat_map(FileExtraction::extra_headers) {
        if !extras.contains(&header) {
            extras.push(header);
        }
    }

    let canonical = labels.len();
    let mut rows = Vec::new();
    for extraction in extractions {
        // position of each combined extra within this extraction's row
        let slots: Vec<Option<usize>> = extras
            .iter()
            .map(|header| {
                extraction
                    .extra_headers()
                    .position(|h| h == *header)
                    .map(|i| canonical + i)
            })
            .collect();
        for row in &extraction.rows {
            let mut out: Vec<Value> = (0..canonical)
                .map(|i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect();
            out.extend(slots.iter().map(|slot| {
                slot.and_then(|i| row.get(i).cloned())
                    .unwrap_or_else(|| Value::String(String::new()))
            }));
            rows.push(out);
        }
    }

    let mut header = labels.to_vec();
    header.extend(extras.into_iter().map(str::to_string));
    SheetData {
        name: sanitize_sheet_name(name),
        header,
        rows,
    }
}

/// Text shown for a value that is not written as a number or boolean.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_text_renders_compact_json() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("a b")), "a b");
        assert_eq!(cell_text(&json!({"k": [1, 2]})), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn width_covers_header_and_rows() {
        let sheet = SheetData {
            name: "s".into(),
            header: vec!["a".into()],
            rows: vec![vec![json!(1), json!(2)]],
        };
        assert_eq!(sheet.width(), 2);
    }
}
