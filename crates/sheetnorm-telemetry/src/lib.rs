//! Job telemetry: durable artifact summary, NDJSON event log and fan-out.

pub mod artifact;
pub mod bindings;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod provider;

pub use artifact::{
    ARTIFACT_SCHEMA, ArtifactConfig, ArtifactDocument, ArtifactJob, ArtifactNote, ArtifactSink,
    ArtifactStatus, FileArtifactSink, MappedFieldSummary, TableSummary,
};
pub use bindings::{CORRELATION_ID_KEY, TelemetryBindings, payload};
pub use catalog::{STDERR_SINK_SPEC, SinkCatalog, TRACING_SINK_SPEC};
pub use config::{
    EVENT_LEVEL_ENV, EVENT_SINKS_ENV, EventSinkFactory, NOTE_LEVEL_ENV, RUN_ID_ENV,
    TelemetryConfig,
};
pub use error::{Result, TelemetryError};
pub use events::{
    DispatchEventSink, EVENT_SCHEMA, EventEnvelope, EventSink, NdjsonEventSink, StderrEventSink,
    TracingEventSink,
};
pub use provider::{FileSinkProvider, SinkProvider};
