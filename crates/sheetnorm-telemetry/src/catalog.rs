//! Resolution of `module:callable` event sink specs.

use std::collections::BTreeMap;
use std::sync::Arc;

use sheetnorm_model::JobContext;

use crate::config::{EventSinkFactory, TelemetryConfig};
use crate::error::{Result, TelemetryError};
use crate::events::{EventSink, StderrEventSink, TracingEventSink};

pub const TRACING_SINK_SPEC: &str = "sheetnorm.sinks:tracing";
pub const STDERR_SINK_SPEC: &str = "sheetnorm.sinks:stderr";

/// Named event sink factories that specs can refer to.
#[derive(Clone)]
pub struct SinkCatalog {
    factories: BTreeMap<String, EventSinkFactory>,
}

impl Default for SinkCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SinkCatalog {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        catalog
            .factories
            .insert(TRACING_SINK_SPEC.to_string(), Arc::new(tracing_sink));
        catalog
            .factories
            .insert(STDERR_SINK_SPEC.to_string(), Arc::new(stderr_sink));
        catalog
    }

    pub fn register(&mut self, spec: &str, factory: EventSinkFactory) -> Result<()> {
        let key = parse_spec(spec)?;
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn resolve(&self, spec: &str) -> Result<EventSinkFactory> {
        let key = parse_spec(spec)?;
        self.factories
            .get(&key)
            .cloned()
            .ok_or_else(|| TelemetryError::UnknownSink {
                spec: spec.to_string(),
            })
    }

    pub fn specs(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

fn tracing_sink(_job: &JobContext, _config: &TelemetryConfig) -> Result<Box<dyn EventSink>> {
    Ok(Box::new(TracingEventSink))
}

fn stderr_sink(_job: &JobContext, config: &TelemetryConfig) -> Result<Box<dyn EventSink>> {
    Ok(Box::new(StderrEventSink::new(config.correlation_id.clone())))
}

/// Validates a spec and returns its canonical `module:callable` form.
fn parse_spec(spec: &str) -> Result<String> {
    let invalid = || TelemetryError::InvalidSinkSpec {
        spec: spec.to_string(),
    };
    let (module, callable) = spec.trim().split_once(':').ok_or_else(invalid)?;
    let (module, callable) = (module.trim(), callable.trim());
    if module.is_empty() || callable.is_empty() || callable.contains(':') {
        return Err(invalid());
    }
    Ok(format!("{module}:{callable}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve() {
        let catalog = SinkCatalog::with_builtins();
        assert!(catalog.resolve(TRACING_SINK_SPEC).is_ok());
        assert!(catalog.resolve(" sheetnorm.sinks : stderr ").is_ok());
    }

    #[test]
    fn unknown_and_malformed_specs_fail() {
        let catalog = SinkCatalog::with_builtins();
        assert!(matches!(
            catalog.resolve("acme.audit:sink"),
            Err(TelemetryError::UnknownSink { .. })
        ));
        for spec in ["no-colon", ":callable", "module:", "a:b:c"] {
            assert!(
                matches!(
                    catalog.resolve(spec),
                    Err(TelemetryError::InvalidSinkSpec { .. })
                ),
                "{spec} should be rejected"
            );
        }
    }
}
