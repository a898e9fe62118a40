#![deny(unsafe_code)]

use std::path::PathBuf;

/// Errors raised while loading or validating a manifest.
///
/// All of these are fatal before any job work begins.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {origin} is not valid JSON: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest invalid at {pointer}: {message}")]
    Invalid { pointer: String, message: String },
}

impl ManifestError {
    pub(crate) fn invalid(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
