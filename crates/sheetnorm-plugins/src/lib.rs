//! Script package, column plugin registry and lifecycle hooks.
//!
//! Scripts are in-process modules whose exports declare a [`Signature`].
//! Registries check those signatures once, when a job is prepared.

pub mod args;
pub mod builtins;
pub mod column;
pub mod error;
pub mod hooks;
pub mod module;
pub mod package;
pub mod signature;

pub use args::{DetectorArgs, FieldScores, PluginState, TransformArgs, ValidateArgs, score_for};
pub use builtins::builtin_package;
pub use column::{ColumnModule, ColumnRegistry, NamedDetector};
pub use error::{HookError, PluginError};
pub use hooks::{BoundHook, HookContext, HookRegistry, HookTables};
pub use module::{
    DETECTOR_PREFIX, DetectorFn, Export, ExportBody, HOOK_ENTRYPOINTS, HookFn, ScriptModule,
    TRANSFORM_EXPORT, TransformFn, VALIDATE_EXPORT, ValidateFn,
};
pub use package::{ScriptPackage, normalize_script_ref};
pub use signature::{
    BASE_PARAMETERS, CallableKind, HOOK_CONTEXT_PARAMETER, HOOK_KEYWORDS, HookCallStyle, Param,
    ROW_PARAMETERS, Signature, SignatureViolation, check_column_signature, check_hook_signature,
};
