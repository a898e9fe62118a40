/// Plugin failures while normalizing rows. Validation issues are not errors.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("transformer for field '{field}' failed at row {row_index}: {source}")]
    Transformer {
        field: String,
        row_index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("validator for field '{field}' failed at row {row_index}: {source}")]
    Validator {
        field: String,
        row_index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
