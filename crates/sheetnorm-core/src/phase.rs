use std::path::PathBuf;

use serde_json::json;
use sheetnorm_model::{JobContext, PipelinePhase, Severity};
use sheetnorm_telemetry::{TelemetryBindings, payload};
use tracing::debug;

use crate::error::{PipelineError, Result};

pub const TRANSITION_EVENT: &str = "pipeline.transition";

/// Current phase of a running job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTracker {
    phase: PipelinePhase,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Moves to `next` and emits `pipeline.transition`.
    pub fn advance(
        &mut self,
        next: PipelinePhase,
        job: &JobContext,
        telemetry: &mut TelemetryBindings,
        table_count: usize,
        output_paths: &[PathBuf],
    ) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(from = %self.phase, to = %next, table_count, "pipeline transition");
        self.phase = next;
        let outputs: Vec<String> = output_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        telemetry.emit(
            job,
            Severity::Info,
            TRANSITION_EVENT,
            payload(json!({
                "phase": next.as_str(),
                "table_count": table_count,
                "output_paths": outputs,
            })),
        );
        Ok(())
    }
}
