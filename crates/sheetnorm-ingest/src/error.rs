use std::path::PathBuf;

/// Errors from discovering and reading input tables.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input directory missing.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input format: {path}")]
    UnsupportedFormat { path: PathBuf },

    // === Parsing Errors ===
    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet '{sheet}' of {path}: {source}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    // === Selection Errors ===
    /// None of the requested sheets exist in the workbook.
    #[error("none of the requested sheets {requested:?} exist in {path} (available: {available:?})")]
    SheetFilterUnmatched {
        path: PathBuf,
        requested: Vec<String>,
        available: Vec<String>,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
