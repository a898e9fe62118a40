use sheetnorm_model::JobContext;

use crate::artifact::{ArtifactSink, FileArtifactSink};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::events::{EventSink, NdjsonEventSink};

/// Creates the primary sinks for a job.
pub trait SinkProvider {
    fn artifact_sink(
        &self,
        job: &JobContext,
        config: &TelemetryConfig,
    ) -> Result<Box<dyn ArtifactSink>>;

    fn event_sink(&self, job: &JobContext, config: &TelemetryConfig)
    -> Result<Box<dyn EventSink>>;
}

/// Writes `logs/artifact.json` and `logs/events.ndjson` in the job directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSinkProvider;

impl SinkProvider for FileSinkProvider {
    fn artifact_sink(
        &self,
        job: &JobContext,
        _config: &TelemetryConfig,
    ) -> Result<Box<dyn ArtifactSink>> {
        Ok(Box::new(FileArtifactSink::new(
            job.paths.artifact_path.clone(),
        )))
    }

    fn event_sink(
        &self,
        job: &JobContext,
        config: &TelemetryConfig,
    ) -> Result<Box<dyn EventSink>> {
        Ok(Box::new(
            NdjsonEventSink::new(job.paths.events_path.clone())
                .with_run_id(config.correlation_id.clone()),
        ))
    }
}
