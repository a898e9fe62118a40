//! Header row handling shared by CSV and workbook readers.

use serde_json::Value;

pub(crate) fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(|value| match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    })
}

/// A table split at its header row.
#[derive(Debug, Default)]
pub(crate) struct HeaderSplit {
    pub headers: Vec<String>,
    /// Data rows padded or cut to `headers.len()`.
    pub rows: Vec<Vec<Value>>,
    /// 1-based source row number of each entry in `rows`.
    pub row_numbers: Vec<usize>,
    pub header_row_number: usize,
}

/// Splits positioned rows into headers and padded data rows.
///
/// `rows` pairs each non-blank row with its 1-based source row number. The
/// first of them is the header; every later row is data.
pub(crate) fn split_header(rows: Vec<(usize, Vec<Value>)>) -> HeaderSplit {
    let mut rows = rows.into_iter();
    let Some((header_row_number, header)) = rows.next() else {
        return HeaderSplit::default();
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| normalize_header(&cell_text(cell)))
        .collect();
    let width = headers.len();
    let (row_numbers, data): (Vec<usize>, Vec<Vec<Value>>) = rows
        .map(|(number, mut row)| {
            row.resize(width, Value::Null);
            (number, row)
        })
        .unzip();
    HeaderSplit {
        headers,
        rows: data,
        row_numbers,
        header_row_number,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| json!(cell)).collect())
            .collect()
    }

    #[test]
    fn first_non_blank_row_is_the_header() {
        let rows = vec![
            (1, text_rows(&[&["Member Name", "Status"]]).remove(0)),
            (2, text_rows(&[&["ada", "active"]]).remove(0)),
            (3, vec![json!("bob"), Value::Null]),
            (4, text_rows(&[&["carol", "inactive"]]).remove(0)),
        ];
        let split = split_header(rows);
        assert_eq!(split.headers, vec!["Member Name", "Status"]);
        assert_eq!(split.rows.len(), 3);
        assert_eq!(split.row_numbers, vec![2, 3, 4]);
        assert_eq!(split.header_row_number, 1);
    }

    #[test]
    fn label_rows_above_codes_are_not_skipped() {
        let rows = vec![
            (1, text_rows(&[&["Member Id", "Given Name"]]).remove(0)),
            (2, text_rows(&[&["ID", "NAME"]]).remove(0)),
        ];
        let split = split_header(rows);
        assert_eq!(split.headers, vec!["Member Id", "Given Name"]);
        assert_eq!(split.rows, text_rows(&[&["ID", "NAME"]]));
    }

    #[test]
    fn header_cells_are_collapsed() {
        assert_eq!(normalize_header("\u{feff}  Member   Id "), "Member Id");
    }

    #[test]
    fn split_pads_short_rows() {
        let rows = vec![
            (1, text_rows(&[&["A", "B"]]).remove(0)),
            (3, vec![json!("x")]),
        ];
        let split = split_header(rows);
        assert_eq!(split.headers, vec!["A", "B"]);
        assert_eq!(split.rows, vec![vec![json!("x"), Value::Null]]);
        assert_eq!(split.row_numbers, vec![3]);
        assert_eq!(split.header_row_number, 1);
    }

    #[test]
    fn no_rows_means_no_header() {
        let split = split_header(Vec::new());
        assert!(split.headers.is_empty());
        assert_eq!(split.header_row_number, 0);
    }
}
