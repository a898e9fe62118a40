//! Per-job telemetry front door.
//!
//! Applies severity gating and correlation before anything reaches the
//! durable sinks. Entries below the configured minimum only go to `tracing`.

use std::path::PathBuf;

use serde_json::{Map, Value};
use sheetnorm_model::{JobContext, Severity};
use tracing::{debug, warn};

use crate::artifact::{ArtifactDocument, ArtifactSink, TableSummary};
use crate::catalog::SinkCatalog;
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::events::{DispatchEventSink, EventSink};
use crate::provider::SinkProvider;

pub const CORRELATION_ID_KEY: &str = "correlation_id";

pub struct TelemetryBindings {
    artifact: Box<dyn ArtifactSink>,
    events: DispatchEventSink,
    correlation_id: Option<String>,
    min_note_level: Severity,
    min_event_level: Severity,
}

impl TelemetryBindings {
    /// Resolves every configured sink for `job`.
    ///
    /// Specs are resolved here, once; an unknown spec fails the bind.
    pub fn bind(
        job: &JobContext,
        config: &TelemetryConfig,
        provider: &dyn SinkProvider,
        catalog: &SinkCatalog,
    ) -> Result<Self> {
        let artifact = provider.artifact_sink(job, config)?;
        let mut events = DispatchEventSink::new(vec![provider.event_sink(job, config)?]);
        for factory in &config.event_sink_factories {
            events.push(factory(job, config)?);
        }
        for spec in &config.event_sink_specs {
            let factory = catalog.resolve(spec)?;
            events.push(factory(job, config)?);
        }
        debug!(
            job_id = %job.job_id,
            sinks = ?events.sink_names(),
            correlation_id = config.correlation_id.as_deref().unwrap_or(""),
            "telemetry bound"
        );
        Ok(Self::new(artifact, events, config))
    }

    pub fn new(
        artifact: Box<dyn ArtifactSink>,
        events: DispatchEventSink,
        config: &TelemetryConfig,
    ) -> Self {
        Self {
            artifact,
            events,
            correlation_id: config.correlation_id.clone(),
            min_note_level: config.min_note_level,
            min_event_level: config.min_event_level,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn start(&mut self, job: &JobContext) -> Result<()> {
        self.artifact.start(job)
    }

    /// Appends a note to the artifact if `level` passes the note threshold.
    pub fn note(&mut self, level: Severity, message: &str, details: Map<String, Value>) {
        let details = self.correlate(details);
        if level < self.min_note_level {
            let details = Value::Object(details);
            debug!(%level, note = message, %details, "note below threshold");
            return;
        }
        self.artifact.note(level, message, details);
    }

    /// Sends an event to every sink if `level` passes the event threshold.
    ///
    /// Sink failures are logged and do not propagate.
    pub fn emit(
        &mut self,
        job: &JobContext,
        level: Severity,
        event: &str,
        payload: Map<String, Value>,
    ) {
        let payload = self.correlate(payload);
        if level < self.min_event_level {
            let payload = Value::Object(payload);
            debug!(%level, event, %payload, "event below threshold");
            return;
        }
        if let Err(err) = self.events.log(event, level, job, &payload) {
            warn!(job_id = %job.job_id, event, error = %err, "event sink failure");
        }
    }

    pub fn record_table(&mut self, table: TableSummary) {
        self.artifact.record_table(table);
    }

    pub fn mark_success(&mut self, outputs: &[PathBuf]) {
        self.artifact.mark_success(outputs);
    }

    pub fn mark_failure(&mut self, error: &str) {
        self.artifact.mark_failure(error);
    }

    pub fn flush(&mut self) -> Result<()> {
        self.artifact.flush()
    }

    pub fn artifact(&self) -> Option<&ArtifactDocument> {
        self.artifact.document()
    }

    fn correlate(&self, mut map: Map<String, Value>) -> Map<String, Value> {
        if let Some(id) = &self.correlation_id {
            map.entry(CORRELATION_ID_KEY)
                .or_insert_with(|| Value::String(id.clone()));
        }
        map
    }
}

/// Turns a JSON object into an event payload; other values land under `value`.
pub fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
