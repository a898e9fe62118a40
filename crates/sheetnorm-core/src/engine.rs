//! Engine facade: job preparation, execution and manifest activation.

use std::path::Path;
use std::sync::Arc;

use sheetnorm_model::{HookStage, JobContext, JobPaths, JobResult, LoadedManifest};
use sheetnorm_output::{WorkbookWriter, XlsxWorkbookWriter};
use sheetnorm_plugins::{ColumnRegistry, HookContext, HookRegistry, ScriptPackage};
use sheetnorm_telemetry::{FileSinkProvider, SinkCatalog, SinkProvider, TelemetryBindings};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::request::{JobRequest, check_job_id};
use crate::runner::PipelineRunner;

/// Job id given to the context that `on_activate` hooks see.
pub const ACTIVATION_JOB_ID: &str = "activation";

/// Runs jobs against one script package.
pub struct Engine {
    package: ScriptPackage,
    sink_provider: Box<dyn SinkProvider>,
    sink_catalog: SinkCatalog,
    workbook_writer: Box<dyn WorkbookWriter>,
}

impl Engine {
    /// Uses file sinks in the job directory, the built-in sink catalog and
    /// the XLSX writer.
    pub fn new(package: ScriptPackage) -> Self {
        Self {
            package,
            sink_provider: Box::new(FileSinkProvider),
            sink_catalog: SinkCatalog::with_builtins(),
            workbook_writer: Box::new(XlsxWorkbookWriter),
        }
    }

    #[must_use]
    pub fn with_sink_provider(mut self, provider: impl SinkProvider + 'static) -> Self {
        self.sink_provider = Box::new(provider);
        self
    }

    #[must_use]
    pub fn with_sink_catalog(mut self, catalog: SinkCatalog) -> Self {
        self.sink_catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_workbook_writer(mut self, writer: impl WorkbookWriter + 'static) -> Self {
        self.workbook_writer = Box::new(writer);
        self
    }

    pub fn package(&self) -> &ScriptPackage {
        &self.package
    }

    /// Loads the manifest, creates the job directories and binds registries
    /// and telemetry. Nothing has run when this returns.
    pub fn prepare(&self, request: JobRequest) -> Result<PreparedJob<'_>, EngineError> {
        check_job_id(&request.job_id)?;
        let manifest = LoadedManifest::from_path(&request.manifest_path)?;

        let paths = JobPaths::new(&request.jobs_root, &request.job_id);
        paths.ensure().map_err(|source| EngineError::JobDirectory {
            path: paths.job_dir.clone(),
            source,
        })?;

        let job = JobContext::new(request.job_id, Arc::new(manifest), paths)
            .with_safe_mode(request.safe_mode)
            .with_metadata(request.metadata);

        let columns = ColumnRegistry::build(&job.manifest, &self.package)?;
        let hooks = HookRegistry::build(&job.manifest, &self.package)?;
        let telemetry = TelemetryBindings::bind(
            &job,
            &request.telemetry,
            self.sink_provider.as_ref(),
            &self.sink_catalog,
        )?;

        info!(
            job_id = %job.job_id,
            manifest = %job.manifest.origin,
            fields = columns.len(),
            hooks = hooks.len(),
            safe_mode = job.safe_mode,
            "job prepared"
        );
        Ok(PreparedJob {
            engine: self,
            job,
            columns,
            hooks,
            telemetry,
        })
    }

    /// Prepares and runs a job. Preparation errors are returned; everything
    /// after that ends up in the [`JobResult`].
    pub fn run_job(&self, request: JobRequest) -> Result<JobResult, EngineError> {
        Ok(self.prepare(request)?.run())
    }

    /// Validates a manifest against the package and runs its `on_activate`
    /// hooks.
    pub fn activate(&self, manifest_path: &Path) -> Result<Activation, EngineError> {
        let manifest = Arc::new(LoadedManifest::from_path(manifest_path)?);
        let columns = ColumnRegistry::build(&manifest, &self.package)?;
        let hooks = HookRegistry::build(&manifest, &self.package)?;

        let root = manifest_path.parent().unwrap_or_else(|| Path::new(""));
        let mut job = JobContext::new(
            ACTIVATION_JOB_ID,
            Arc::clone(&manifest),
            JobPaths::new(root, ACTIVATION_JOB_ID),
        );
        let activated = hooks.hooks(HookStage::OnActivate).len();
        hooks.run(&mut HookContext::new(HookStage::OnActivate, &mut job))?;
        debug!(hooks = activated, "activation hooks complete");

        Ok(Activation {
            manifest,
            columns,
            hooks,
            metadata: job.metadata,
        })
    }
}

/// A job ready to run.
pub struct PreparedJob<'e> {
    engine: &'e Engine,
    job: JobContext,
    columns: ColumnRegistry,
    hooks: HookRegistry,
    telemetry: TelemetryBindings,
}

impl PreparedJob<'_> {
    pub fn job(&self) -> &JobContext {
        &self.job
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn run(self) -> JobResult {
        PipelineRunner::new(
            self.job,
            self.columns,
            self.hooks,
            self.telemetry,
            self.engine.workbook_writer.as_ref(),
        )
        .run()
    }
}

/// Result of [`Engine::activate`].
#[derive(Debug)]
pub struct Activation {
    pub manifest: Arc<LoadedManifest>,
    pub columns: ColumnRegistry,
    pub hooks: HookRegistry,
    /// Metadata left behind by `on_activate` hooks.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
