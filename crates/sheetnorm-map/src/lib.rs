//! Column-to-field mapping driven by plugin detectors.

pub mod engine;
pub mod error;
pub mod sample;
pub mod utils;

pub use engine::{MappingEngine, TableMapping};
pub use error::{MappingError, Result};
pub use sample::sample_column;
pub use utils::{ExtraHeaders, MAX_EXTRA_HEADER_LEN, normalize_header, slug};
