use std::fmt;
use std::sync::Arc;

use sheetnorm_model::{JobContext, Severity};

use crate::error::{Result, TelemetryError};
use crate::events::EventSink;

pub const EVENT_SINKS_ENV: &str = "SHEETNORM_EVENT_SINKS";
pub const NOTE_LEVEL_ENV: &str = "SHEETNORM_NOTE_LEVEL";
pub const EVENT_LEVEL_ENV: &str = "SHEETNORM_EVENT_LEVEL";
pub const RUN_ID_ENV: &str = "SHEETNORM_RUN_ID";

/// Builds an extra event sink for a job.
pub type EventSinkFactory =
    Arc<dyn Fn(&JobContext, &TelemetryConfig) -> Result<Box<dyn EventSink>> + Send + Sync>;

/// Telemetry settings bound once per job.
#[derive(Clone, Default)]
pub struct TelemetryConfig {
    pub correlation_id: Option<String>,
    pub min_note_level: Severity,
    pub min_event_level: Severity,
    /// `module:callable` specs resolved through a [`crate::SinkCatalog`].
    pub event_sink_specs: Vec<String>,
    pub event_sink_factories: Vec<EventSinkFactory>,
}

impl fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("correlation_id", &self.correlation_id)
            .field("min_note_level", &self.min_note_level)
            .field("min_event_level", &self.min_event_level)
            .field("event_sink_specs", &self.event_sink_specs)
            .field("event_sink_factories", &self.event_sink_factories.len())
            .finish()
    }
}

impl TelemetryConfig {
    /// Reads `SHEETNORM_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(EVENT_SINKS_ENV) {
            config.event_sink_specs = parse_spec_list(&raw);
        }
        if let Some(raw) = lookup(NOTE_LEVEL_ENV) {
            config.min_note_level = parse_level(NOTE_LEVEL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(EVENT_LEVEL_ENV) {
            config.min_event_level = parse_level(EVENT_LEVEL_ENV, &raw)?;
        }
        config.correlation_id = lookup(RUN_ID_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|id| !id.is_empty());
        Ok(config)
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: Option<String>) -> Self {
        if id.is_some() {
            self.correlation_id = id;
        }
        self
    }

    #[must_use]
    pub fn with_note_level(mut self, level: Severity) -> Self {
        self.min_note_level = level;
        self
    }

    #[must_use]
    pub fn with_event_level(mut self, level: Severity) -> Self {
        self.min_event_level = level;
        self
    }

    #[must_use]
    pub fn with_sink_spec(mut self, spec: impl Into<String>) -> Self {
        self.event_sink_specs.push(spec.into());
        self
    }

    #[must_use]
    pub fn with_sink_factory(mut self, factory: EventSinkFactory) -> Self {
        self.event_sink_factories.push(factory);
        self
    }
}

fn parse_spec_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_level(variable: &'static str, raw: &str) -> Result<Severity> {
    raw.parse().map_err(|e: sheetnorm_model::ParseSeverityError| {
        TelemetryError::InvalidEnv {
            variable,
            value: raw.to_string(),
            message: e.to_string(),
        }
    })
}
