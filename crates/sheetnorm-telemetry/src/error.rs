use std::path::PathBuf;

use sheetnorm_model::AtomicWriteError;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    AtomicWrite(#[from] AtomicWriteError),

    #[error("artifact sink used before start()")]
    NotStarted,

    #[error("invalid event sink spec '{spec}' (expected 'module:callable')")]
    InvalidSinkSpec { spec: String },

    #[error("unknown event sink '{spec}'")]
    UnknownSink { spec: String },

    #[error("invalid value '{value}' for {variable}: {message}")]
    InvalidEnv {
        variable: &'static str,
        value: String,
        message: String,
    },

    #[error("{failed} of {total} event sinks failed: {}", messages.join("; "))]
    Dispatch {
        failed: usize,
        total: usize,
        messages: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
