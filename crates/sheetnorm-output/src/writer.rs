//! Workbook writers.

use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use sheetnorm_model::write_atomic;
use tracing::debug;

use crate::compose::{SheetData, cell_text};
use crate::error::{OutputError, Result};

/// Serializes composed sheets to a workbook file.
pub trait WorkbookWriter {
    fn write(&self, path: &Path, sheets: &[SheetData]) -> Result<()>;
}

/// Writes `.xlsx` through `rust_xlsxwriter`, renaming into place when done.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxWorkbookWriter;

impl WorkbookWriter for XlsxWorkbookWriter {
    fn write(&self, path: &Path, sheets: &[SheetData]) -> Result<()> {
        let xlsx_error = |source| OutputError::Xlsx {
            path: path.to_path_buf(),
            source,
        };
        let mut workbook = Workbook::new();
        for sheet in sheets {
            check_limits(sheet)?;
            let worksheet = workbook
                .add_worksheet()
                .set_name(&sheet.name)
                .map_err(xlsx_error)?;
            write_sheet(worksheet, sheet).map_err(xlsx_error)?;
        }
        // an empty workbook still needs one sheet to be valid
        if sheets.is_empty() {
            workbook.add_worksheet();
        }
        let bytes = workbook.save_to_buffer().map_err(xlsx_error)?;
        write_atomic(path, &bytes)?;
        debug!(path = %path.display(), sheets = sheets.len(), bytes = bytes.len(), "workbook written");
        Ok(())
    }
}

const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

fn check_limits(sheet: &SheetData) -> Result<()> {
    let rows = sheet.rows.len() + 1;
    let columns = sheet.width();
    if rows > MAX_ROWS || columns > MAX_COLUMNS {
        return Err(OutputError::SheetTooLarge {
            sheet: sheet.name.clone(),
            rows,
            columns,
        });
    }
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetData) -> std::result::Result<(), XlsxError> {
    for (col, header) in sheet.header.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }
    for (index, row) in sheet.rows.iter().enumerate() {
        let row_num = (index + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, value)?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> std::result::Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(flag) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        Value::Number(number) => match number.as_f64() {
            Some(n) if n.is_finite() => {
                worksheet.write_number(row, col, n)?;
            }
            _ => {
                worksheet.write_string(row, col, number.to_string())?;
            }
        },
        other => {
            worksheet.write_string(row, col, cell_text(other))?;
        }
    }
    Ok(())
}
