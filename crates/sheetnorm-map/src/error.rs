/// Failures while mapping input columns to fields.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("detector '{detector}' for field '{field}' failed on column {column_index}: {source}")]
    Detector {
        field: String,
        detector: String,
        /// 1-based.
        column_index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("table '{table}' has {headers} headers but {columns} value columns")]
    ShapeMismatch {
        table: String,
        headers: usize,
        columns: usize,
    },
}

pub type Result<T> = std::result::Result<T, MappingError>;
