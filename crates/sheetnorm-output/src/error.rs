use std::path::PathBuf;

use sheetnorm_model::AtomicWriteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to build workbook {path}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("sheet '{sheet}' is too large for a workbook ({rows} rows, {columns} columns)")]
    SheetTooLarge {
        sheet: String,
        rows: usize,
        columns: usize,
    },

    #[error("failed to store normalized sheets in job metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    #[error(transparent)]
    Write(#[from] AtomicWriteError),
}

pub type Result<T> = std::result::Result<T, OutputError>;
