//! Per-row normalization of mapped tables.

pub mod engine;
pub mod error;

pub use engine::{NormalizationEngine, NormalizedRows};
pub use error::{NormalizeError, Result};
