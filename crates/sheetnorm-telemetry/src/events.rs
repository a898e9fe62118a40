//! Append-only event log and fan-out.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sheetnorm_model::{JobContext, Severity};
use tracing::{debug, error, info, warn};

use crate::artifact::timestamp;
use crate::error::{Result, TelemetryError};

pub const EVENT_SCHEMA: &str = "sheetnorm.event/v1";
pub const EVENT_VERSION: &str = "1.0.0";

/// One line of `events.ndjson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub schema: String,
    pub version: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub timestamp: String,
    pub event: String,
    pub level: Severity,
    pub payload: Map<String, Value>,
}

impl EventEnvelope {
    pub fn new(
        event: &str,
        level: Severity,
        job: &JobContext,
        run_id: Option<&str>,
        payload: &Map<String, Value>,
    ) -> Self {
        Self {
            schema: EVENT_SCHEMA.to_string(),
            version: EVENT_VERSION.to_string(),
            job_id: job.job_id.clone(),
            run_id: run_id.map(str::to_string),
            timestamp: timestamp(Utc::now()),
            event: event.to_string(),
            level,
            payload: payload.clone(),
        }
    }

    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| TelemetryError::Serialize {
            what: "event envelope",
            source,
        })
    }
}

/// Receives structured job events, one call per event.
pub trait EventSink {
    fn log(
        &mut self,
        event: &str,
        level: Severity,
        job: &JobContext,
        payload: &Map<String, Value>,
    ) -> Result<()>;

    /// Identifier used in diagnostics.
    fn name(&self) -> &str;
}

/// Appends newline-delimited JSON envelopes to a file.
pub struct NdjsonEventSink {
    path: PathBuf,
    run_id: Option<String>,
}

impl NdjsonEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            run_id: None,
        }
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for NdjsonEventSink {
    fn log(
        &mut self,
        event: &str,
        level: Severity,
        job: &JobContext,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let envelope = EventEnvelope::new(event, level, job, self.run_id.as_deref(), payload);
        let mut line = envelope.to_line()?;
        line.push('\n');
        let io_error = |operation: &'static str, source: io::Error| TelemetryError::Io {
            operation,
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error("open", e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| io_error("append to", e))
    }

    fn name(&self) -> &str {
        "ndjson"
    }
}

/// Re-emits events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn log(
        &mut self,
        event: &str,
        level: Severity,
        job: &JobContext,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let payload = Value::Object(payload.clone());
        match level {
            Severity::Debug => debug!(job_id = %job.job_id, event, %payload, "job event"),
            Severity::Info => info!(job_id = %job.job_id, event, %payload, "job event"),
            Severity::Warning => warn!(job_id = %job.job_id, event, %payload, "job event"),
            Severity::Error | Severity::Critical => {
                error!(job_id = %job.job_id, event, level = %level, %payload, "job event");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Writes envelopes to stderr, one per line.
#[derive(Debug, Default)]
pub struct StderrEventSink {
    run_id: Option<String>,
}

impl StderrEventSink {
    pub fn new(run_id: Option<String>) -> Self {
        Self { run_id }
    }
}

impl EventSink for StderrEventSink {
    fn log(
        &mut self,
        event: &str,
        level: Severity,
        job: &JobContext,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let envelope = EventEnvelope::new(event, level, job, self.run_id.as_deref(), payload);
        let line = envelope.to_line()?;
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{line}").map_err(|source| TelemetryError::Io {
            operation: "write",
            path: PathBuf::from("<stderr>"),
            source,
        })
    }

    fn name(&self) -> &str {
        "stderr"
    }
}

/// Broadcasts every event to each configured sink.
///
/// Sinks are called independently; a failing sink does not stop the others.
/// Failures are collected and reported once all sinks have run.
#[derive(Default)]
pub struct DispatchEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl DispatchEventSink {
    pub fn new(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl EventSink for DispatchEventSink {
    fn log(
        &mut self,
        event: &str,
        level: Severity,
        job: &JobContext,
        payload: &Map<String, Value>,
    ) -> Result<()> {
        let total = self.sinks.len();
        let mut messages = Vec::new();
        for sink in &mut self.sinks {
            if let Err(err) = sink.log(event, level, job, payload) {
                messages.push(format!("{}: {err}", sink.name()));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(TelemetryError::Dispatch {
                failed: messages.len(),
                total,
                messages,
            })
        }
    }

    fn name(&self) -> &str {
        "dispatch"
    }
}
