//! Job pipeline with explicit phases.
//!
//! 1. `on_job_start` hooks
//! 2. **Extracting**: read, map and normalize every input table
//! 3. `on_after_extract` hooks (tables readable)
//! 4. **Writing output**: `on_before_save` hooks (tables mutable), then the
//!    normalized workbook
//! 5. `on_job_end` hooks with the final result, then the artifact flush
//!
//! Any failure moves the job to `failed`. `on_job_end` still runs and the
//! artifact is always flushed; neither can replace the original error.

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Map;
use sheetnorm_model::{FileExtraction, HookStage, JobContext, JobResult, PipelinePhase, Severity};
use sheetnorm_output::{WorkbookWriter, write_outputs};
use sheetnorm_plugins::{ColumnRegistry, HookContext, HookError, HookRegistry, HookTables, PluginState};
use sheetnorm_telemetry::TelemetryBindings;
use tracing::{debug, error, info, info_span, warn};

use crate::error::Result;
use crate::extract::extract_tables;
use crate::phase::PhaseTracker;

pub struct PipelineRunner<'a> {
    job: JobContext,
    columns: ColumnRegistry,
    hooks: HookRegistry,
    telemetry: TelemetryBindings,
    writer: &'a dyn WorkbookWriter,
    phase: PhaseTracker,
    state: PluginState,
    extractions: Vec<FileExtraction>,
    processed_files: Vec<String>,
    outputs: Vec<PathBuf>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        job: JobContext,
        columns: ColumnRegistry,
        hooks: HookRegistry,
        telemetry: TelemetryBindings,
        writer: &'a dyn WorkbookWriter,
    ) -> Self {
        Self {
            job,
            columns,
            hooks,
            telemetry,
            writer,
            phase: PhaseTracker::new(),
            state: PluginState::new(),
            extractions: Vec::new(),
            processed_files: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase.phase()
    }

    /// Runs the job to completion. Never panics on job failures; they come
    /// back as a failed [`JobResult`].
    pub fn run(mut self) -> JobResult {
        let span = info_span!("job", job_id = %self.job.job_id);
        let _guard = span.enter();
        let start = Instant::now();

        let result = match self.execute() {
            Ok(()) => self.finish_success(),
            Err(err) => self.finish_failure(&err.to_string()),
        };

        if let Err(err) = self.telemetry.flush() {
            error!(error = %err, "artifact flush failed");
        }
        info!(
            status = %result.status,
            tables = self.extractions.len(),
            duration_ms = start.elapsed().as_millis(),
            "job finished"
        );
        result
    }

    fn execute(&mut self) -> Result<()> {
        self.telemetry.start(&self.job)?;
        if self.job.safe_mode {
            self.telemetry.note(
                Severity::Info,
                "safe mode: hook stages are skipped",
                Map::new(),
            );
        }

        self.run_stage(HookStage::OnJobStart)?;

        self.advance(PipelinePhase::Extracting)?;
        self.extractions = extract_tables(
            &self.job,
            &self.columns,
            &mut self.state,
            &mut self.telemetry,
            &mut self.processed_files,
        )?;
        self.run_stage(HookStage::OnAfterExtract)?;

        self.advance(PipelinePhase::WritingOutput)?;
        self.run_stage(HookStage::OnBeforeSave)?;
        self.outputs = write_outputs(&mut self.job, &self.extractions, self.writer)?;
        self.telemetry.mark_success(&self.outputs);
        Ok(())
    }

    fn finish_success(&mut self) -> JobResult {
        let result = JobResult::succeeded(
            &self.job,
            self.outputs.clone(),
            self.processed_files.clone(),
        );
        match self.run_job_end(&result) {
            Ok(()) => {
                if let Err(err) = self.advance(PipelinePhase::Completed) {
                    warn!(error = %err, "could not mark job completed");
                }
                result
            }
            Err(err) => {
                let message = err.to_string();
                error!(error = %message, "on_job_end failed after a successful run");
                self.mark_failed(&message);
                JobResult::failed(&self.job, self.processed_files.clone(), message)
            }
        }
    }

    fn finish_failure(&mut self, message: &str) -> JobResult {
        error!(phase = %self.phase(), error = %message, "job failed");
        self.mark_failed(message);
        let result = JobResult::failed(&self.job, self.processed_files.clone(), message);
        if let Err(err) = self.run_job_end(&result) {
            warn!(error = %err, "on_job_end failed while handling a failure");
            self.telemetry.note(
                Severity::Error,
                &format!("on_job_end failed: {err}"),
                Map::new(),
            );
        }
        result
    }

    fn mark_failed(&mut self, message: &str) {
        if let Err(err) = self.advance(PipelinePhase::Failed) {
            warn!(error = %err, "could not mark job failed");
        }
        self.telemetry.mark_failure(message);
    }

    fn advance(&mut self, next: PipelinePhase) -> Result<()> {
        self.phase.advance(
            next,
            &self.job,
            &mut self.telemetry,
            self.extractions.len(),
            &self.outputs,
        )
    }

    fn run_stage(&mut self, stage: HookStage) -> std::result::Result<(), HookError> {
        let tables = match stage {
            HookStage::OnAfterExtract => HookTables::ReadOnly(&self.extractions),
            HookStage::OnBeforeSave => HookTables::Mutable(&mut self.extractions),
            _ => HookTables::None,
        };
        run_hooks(
            &self.hooks,
            stage,
            &mut self.job,
            &mut self.telemetry,
            tables,
            None,
        )
    }

    fn run_job_end(&mut self, result: &JobResult) -> std::result::Result<(), HookError> {
        run_hooks(
            &self.hooks,
            HookStage::OnJobEnd,
            &mut self.job,
            &mut self.telemetry,
            HookTables::ReadOnly(&self.extractions),
            Some(result),
        )
    }
}

fn run_hooks(
    hooks: &HookRegistry,
    stage: HookStage,
    job: &mut JobContext,
    telemetry: &mut TelemetryBindings,
    tables: HookTables<'_>,
    result: Option<&JobResult>,
) -> std::result::Result<(), HookError> {
    if hooks.hooks(stage).is_empty() {
        return Ok(());
    }
    if job.safe_mode {
        debug!(%stage, "hooks skipped in safe mode");
        return Ok(());
    }
    let start = Instant::now();
    let mut ctx = HookContext::new(stage, job)
        .with_telemetry(telemetry)
        .with_tables(tables);
    if let Some(result) = result {
        ctx = ctx.with_result(result);
    }
    hooks.run(&mut ctx)?;
    debug!(
        %stage,
        hooks = hooks.hooks(stage).len(),
        duration_ms = start.elapsed().as_millis(),
        "hook stage complete"
    );
    Ok(())
}
