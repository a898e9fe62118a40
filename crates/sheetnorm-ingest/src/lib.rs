//! Input discovery and table reading for CSV files and workbooks.

pub mod csv_table;
pub mod discovery;
pub mod error;
mod header;
pub mod table;
pub mod workbook;

pub use csv_table::read_csv_table;
pub use discovery::{InputFile, InputFormat, list_input_files};
pub use error::{IngestError, Result};
pub use table::RawTable;
pub use workbook::read_workbook_tables;

/// Reads every table of one input file.
///
/// The sheet filter only applies to workbooks; a CSV file is always one table.
pub fn read_input(file: &InputFile, sheet_filter: Option<&[String]>) -> Result<Vec<RawTable>> {
    match file.format {
        InputFormat::Csv => read_csv_table(&file.path).map(|table| vec![table]),
        InputFormat::Workbook => read_workbook_tables(&file.path, sheet_filter),
    }
}
