//! Job engine for sheetnorm.
//!
//! [`Engine::prepare`] turns a [`JobRequest`] into a [`PreparedJob`] (manifest
//! loaded, job directories created, registries and telemetry bound) and
//! [`PreparedJob::run`] drives the pipeline to a [`JobResult`].
//!
//! [`JobResult`]: sheetnorm_model::JobResult

pub mod engine;
pub mod error;
pub mod extract;
pub mod phase;
pub mod request;
pub mod runner;

pub use engine::{ACTIVATION_JOB_ID, Activation, Engine, PreparedJob};
pub use error::{EngineError, PipelineError, Result};
pub use extract::{TABLE_EXTRACTED_EVENT, VALIDATION_ISSUE_EVENT, extract_tables};
pub use phase::{PhaseTracker, TRANSITION_EVENT};
pub use request::JobRequest;
pub use runner::PipelineRunner;
