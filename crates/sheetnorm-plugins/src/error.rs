use sheetnorm_model::HookStage;

use crate::signature::CallableKind;

/// Column plugin load failures, raised while building the registry.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("invalid script reference '{script}': {message}")]
    InvalidScriptRef { script: String, message: String },

    #[error("script module '{module}' is already registered")]
    DuplicateModule { module: String },

    #[error("field '{field}': script module '{script}' not found")]
    ModuleNotFound { field: String, script: String },

    #[error("field '{field}': {kind} '{callable}' must accept parameter '{parameter}'")]
    MissingParameter {
        field: String,
        kind: CallableKind,
        callable: String,
        parameter: String,
    },

    #[error("field '{field}': {kind} '{callable}' declares unsupported parameter '{parameter}'")]
    UnsupportedParameter {
        field: String,
        kind: CallableKind,
        callable: String,
        parameter: String,
    },

    #[error("field '{field}': export '{callable}' is a {found}, expected a {expected}")]
    ExportKindMismatch {
        field: String,
        callable: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Hook load and execution failures.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{stage} hook '{script}': invalid script reference: {message}")]
    InvalidScriptRef {
        stage: HookStage,
        script: String,
        message: String,
    },

    #[error("{stage} hook '{script}': script module not found")]
    ModuleNotFound { stage: HookStage, script: String },

    #[error("{stage} hook '{script}': module exposes neither 'run' nor 'main'")]
    MissingEntrypoint { stage: HookStage, script: String },

    #[error("{stage} hook '{script}': export '{callable}' is a {found}, not a hook")]
    ExportKindMismatch {
        stage: HookStage,
        script: String,
        callable: String,
        found: &'static str,
    },

    #[error("{stage} hook '{script}:{callable}' declares unsupported parameter '{parameter}'")]
    UnsupportedSignature {
        stage: HookStage,
        script: String,
        callable: String,
        parameter: String,
    },

    #[error("{stage} hook '{script}:{callable}' failed: {source}")]
    Execution {
        stage: HookStage,
        script: String,
        callable: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
