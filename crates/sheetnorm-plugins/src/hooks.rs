//! Lifecycle hooks: resolution against the script package and invocation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sheetnorm_model::{
    FileExtraction, HookStage, JobContext, JobResult, LoadedManifest, Severity,
};
use sheetnorm_telemetry::{ArtifactDocument, TelemetryBindings};
use tracing::{debug, info};

use crate::error::{HookError, PluginError};
use crate::module::{ExportBody, HOOK_ENTRYPOINTS, HookFn};
use crate::package::ScriptPackage;
use crate::signature::{HookCallStyle, check_hook_signature};

/// What a hook may see of the extracted tables.
pub enum HookTables<'a> {
    None,
    ReadOnly(&'a [FileExtraction]),
    Mutable(&'a mut Vec<FileExtraction>),
}

/// Everything a hook receives, whichever way it is called.
pub struct HookContext<'a> {
    pub stage: HookStage,
    pub job: &'a mut JobContext,
    /// Absent during activation, where no job telemetry exists.
    pub telemetry: Option<&'a mut TelemetryBindings>,
    pub tables: HookTables<'a>,
    pub result: Option<&'a JobResult>,
}

impl<'a> HookContext<'a> {
    pub fn new(stage: HookStage, job: &'a mut JobContext) -> Self {
        Self {
            stage,
            job,
            telemetry: None,
            tables: HookTables::None,
            result: None,
        }
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: &'a mut TelemetryBindings) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: HookTables<'a>) -> Self {
        self.tables = tables;
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: &'a JobResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Adds an artifact note, or logs it when no telemetry is bound.
    pub fn note(&mut self, level: Severity, message: &str, details: Map<String, Value>) {
        match self.telemetry.as_deref_mut() {
            Some(telemetry) => telemetry.note(level, message, details),
            None => info!(stage = %self.stage, %level, note = message, "hook note"),
        }
    }

    pub fn emit(&mut self, level: Severity, event: &str, payload: Map<String, Value>) {
        match self.telemetry.as_deref_mut() {
            Some(telemetry) => telemetry.emit(self.job, level, event, payload),
            None => debug!(stage = %self.stage, event, "hook event without telemetry"),
        }
    }

    pub fn artifact(&self) -> Option<&ArtifactDocument> {
        self.telemetry.as_deref().and_then(TelemetryBindings::artifact)
    }

    pub fn tables(&self) -> &[FileExtraction] {
        match &self.tables {
            HookTables::None => &[],
            HookTables::ReadOnly(tables) => *tables,
            HookTables::Mutable(tables) => tables.as_slice(),
        }
    }

    /// Only `on_before_save` hooks get mutable tables.
    pub fn tables_mut(&mut self) -> Option<&mut Vec<FileExtraction>> {
        match &mut self.tables {
            HookTables::Mutable(tables) => Some(&mut **tables),
            _ => None,
        }
    }
}

/// A hook resolved to its entrypoint.
#[derive(Clone)]
pub struct BoundHook {
    pub script: String,
    pub callable: String,
    /// How the entrypoint declared its parameters. Both styles receive the
    /// same [`HookContext`]; a keyword hook reads only the fields it named.
    pub style: HookCallStyle,
    func: HookFn,
}

impl std::fmt::Debug for BoundHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHook")
            .field("script", &self.script)
            .field("callable", &self.callable)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    stages: BTreeMap<HookStage, Vec<BoundHook>>,
}

impl HookRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves every enabled hook ref of every stage.
    pub fn build(manifest: &LoadedManifest, package: &ScriptPackage) -> Result<Self, HookError> {
        let mut stages = BTreeMap::new();
        for stage in HookStage::ALL {
            let mut bound = Vec::new();
            for hook_ref in manifest.model.hooks.refs(stage) {
                if !hook_ref.enabled {
                    debug!(%stage, script = %hook_ref.script, "hook disabled");
                    continue;
                }
                bound.push(bind_hook(stage, &hook_ref.script, package)?);
            }
            if !bound.is_empty() {
                stages.insert(stage, bound);
            }
        }
        Ok(Self { stages })
    }

    pub fn hooks(&self, stage: HookStage) -> &[BoundHook] {
        self.stages.get(&stage).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the hooks of `ctx.stage` in manifest order, stopping at the first failure.
    pub fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let stage = ctx.stage;
        for hook in self.hooks(stage) {
            debug!(
                %stage,
                script = %hook.script,
                callable = %hook.callable,
                style = ?hook.style,
                "running hook"
            );
            (hook.func)(ctx).map_err(|err| HookError::Execution {
                stage,
                script: hook.script.clone(),
                callable: hook.callable.clone(),
                source: err.into(),
            })?;
        }
        Ok(())
    }
}

fn bind_hook(stage: HookStage, script: &str, package: &ScriptPackage) -> Result<BoundHook, HookError> {
    let module = package
        .resolve(script)
        .map_err(|err| match err {
            PluginError::InvalidScriptRef { message, .. } => HookError::InvalidScriptRef {
                stage,
                script: script.to_string(),
                message,
            },
            other => HookError::InvalidScriptRef {
                stage,
                script: script.to_string(),
                message: other.to_string(),
            },
        })?
        .ok_or_else(|| HookError::ModuleNotFound {
            stage,
            script: script.to_string(),
        })?;

    let export = HOOK_ENTRYPOINTS
        .iter()
        .find_map(|name| module.get(name))
        .ok_or_else(|| HookError::MissingEntrypoint {
            stage,
            script: script.to_string(),
        })?;

    let ExportBody::Hook(func) = &export.body else {
        return Err(HookError::ExportKindMismatch {
            stage,
            script: script.to_string(),
            callable: export.name.clone(),
            found: export.body.kind_name(),
        });
    };

    let style = check_hook_signature(&export.signature).map_err(|parameter| {
        HookError::UnsupportedSignature {
            stage,
            script: script.to_string(),
            callable: export.name.clone(),
            parameter,
        }
    })?;

    Ok(BoundHook {
        script: module.name().to_string(),
        callable: export.name.clone(),
        style,
        func: func.clone(),
    })
}
