//! Normalized workbook output.
//!
//! Extractions are composed into sheets (one per table, or one combined
//! sheet when `output_sheet` is configured) and written to
//! `output/normalized.xlsx` through a [`WorkbookWriter`].

pub mod compose;
pub mod error;
pub mod sheet_names;
pub mod writer;

use std::path::PathBuf;

use sheetnorm_model::{FileExtraction, JobContext, NORMALIZED_SHEETS_METADATA_KEY, WriterMode};
use tracing::info;

pub use compose::{SheetData, cell_text, compose_sheets};
pub use error::{OutputError, Result};
pub use sheet_names::{
    FALLBACK_SHEET_NAME, MAX_SHEET_NAME_LEN, SheetNameAllocator, sanitize_sheet_name,
    table_sheet_base,
};
pub use writer::{WorkbookWriter, XlsxWorkbookWriter};

/// Writes the normalized workbook for a job and returns the written paths.
///
/// In `in_memory` mode the composed sheets are also kept in
/// `job.metadata["normalized_sheets"]`.
pub fn write_outputs(
    job: &mut JobContext,
    extractions: &[FileExtraction],
    writer: &dyn WorkbookWriter,
) -> Result<Vec<PathBuf>> {
    let sheets = compose_sheets(job.manifest(), extractions);
    let path = job.paths.output_path.clone();
    writer.write(&path, &sheets)?;

    if job.manifest().writer().mode == WriterMode::InMemory {
        let value = serde_json::to_value(&sheets).map_err(OutputError::Metadata)?;
        job.set_metadata(NORMALIZED_SHEETS_METADATA_KEY, value);
    }
    info!(
        path = %path.display(),
        sheets = sheets.len(),
        rows = sheets.iter().map(|s| s.rows.len()).sum::<usize>(),
        "normalized workbook written"
    );
    Ok(vec![path])
}
