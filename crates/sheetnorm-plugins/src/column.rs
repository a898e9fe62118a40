//! Column registry: the manifest's enabled fields bound to their script callables.

use std::sync::Arc;

use sheetnorm_model::{ColumnMeta, IssueReport, LoadedManifest};
use tracing::debug;

use crate::args::{DetectorArgs, FieldScores, TransformArgs, ValidateArgs};
use crate::error::PluginError;
use crate::module::{
    DetectorFn, ExportBody, ScriptModule, TRANSFORM_EXPORT, TransformFn, VALIDATE_EXPORT,
    ValidateFn,
};
use crate::package::ScriptPackage;
use crate::signature::{CallableKind, Signature, SignatureViolation, check_column_signature};

/// A detector export, identified as `script:callable`.
#[derive(Clone)]
pub struct NamedDetector {
    pub name: String,
    pub id: String,
    pub signature: Signature,
    func: DetectorFn,
}

impl NamedDetector {
    pub fn call(&self, args: DetectorArgs<'_>) -> anyhow::Result<FieldScores> {
        (self.func)(args)
    }
}

impl std::fmt::Debug for NamedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedDetector")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// One enabled field and whatever callables its script provides.
#[derive(Clone)]
pub struct ColumnModule {
    pub field: String,
    pub meta: ColumnMeta,
    pub script: Option<String>,
    /// Position in `columns.order`.
    pub position: usize,
    pub detectors: Vec<NamedDetector>,
    transformer: Option<TransformFn>,
    validator: Option<ValidateFn>,
}

impl ColumnModule {
    pub fn has_transformer(&self) -> bool {
        self.transformer.is_some()
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// `Ok(None)` when the field has no transformer or it returned no updates.
    pub fn transform(
        &self,
        args: TransformArgs<'_>,
    ) -> anyhow::Result<Option<sheetnorm_model::CanonicalRow>> {
        match &self.transformer {
            Some(func) => func(args),
            None => Ok(None),
        }
    }

    pub fn validate(&self, args: ValidateArgs<'_>) -> anyhow::Result<Vec<IssueReport>> {
        match &self.validator {
            Some(func) => func(args),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for ColumnModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnModule")
            .field("field", &self.field)
            .field("script", &self.script)
            .field("position", &self.position)
            .field("detectors", &self.detectors)
            .field("transformer", &self.transformer.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    modules: Vec<ColumnModule>,
}

impl ColumnRegistry {
    /// Loads every enabled field in manifest order.
    ///
    /// Every callable's signature is checked here so a bad plugin fails the
    /// job before any input is read.
    pub fn build(manifest: &LoadedManifest, package: &ScriptPackage) -> Result<Self, PluginError> {
        let model = &manifest.model;
        let mut modules = Vec::new();
        for (position, field) in model.column_order().iter().enumerate() {
            let Some(meta) = model.field(field) else {
                continue;
            };
            if !meta.enabled {
                debug!(field = %field, "field disabled; not loaded");
                continue;
            }
            let module = match &meta.script {
                Some(script) => Some(package.resolve(script)?.ok_or_else(|| {
                    PluginError::ModuleNotFound {
                        field: field.clone(),
                        script: script.clone(),
                    }
                })?),
                None => None,
            };
            let mut column = ColumnModule {
                field: field.clone(),
                meta: meta.clone(),
                script: module.as_ref().map(|m| m.name().to_string()),
                position,
                detectors: Vec::new(),
                transformer: None,
                validator: None,
            };
            if let Some(module) = module {
                bind_callables(&mut column, &module)?;
            }
            debug!(
                field = %column.field,
                script = column.script.as_deref().unwrap_or("-"),
                detectors = column.detectors.len(),
                transformer = column.has_transformer(),
                validator = column.has_validator(),
                "column module loaded"
            );
            modules.push(column);
        }
        Ok(Self { modules })
    }

    /// Modules in manifest order.
    pub fn modules(&self) -> &[ColumnModule] {
        &self.modules
    }

    pub fn get(&self, field: &str) -> Option<&ColumnModule> {
        self.modules.iter().find(|m| m.field == field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.get(field).map(|m| m.position)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn bind_callables(column: &mut ColumnModule, module: &Arc<ScriptModule>) -> Result<(), PluginError> {
    for export in module.detector_exports() {
        let ExportBody::Detector(func) = &export.body else {
            return Err(kind_mismatch(column, &export.name, CallableKind::Detector, &export.body));
        };
        check(column, CallableKind::Detector, &export.name, &export.signature)?;
        column.detectors.push(NamedDetector {
            name: export.name.clone(),
            id: format!("{}:{}", module.name(), export.name),
            signature: export.signature.clone(),
            func: func.clone(),
        });
    }

    if let Some(export) = module.get(TRANSFORM_EXPORT) {
        let ExportBody::Transformer(func) = &export.body else {
            return Err(kind_mismatch(column, &export.name, CallableKind::Transformer, &export.body));
        };
        check(column, CallableKind::Transformer, &export.name, &export.signature)?;
        column.transformer = Some(func.clone());
    }

    if let Some(export) = module.get(VALIDATE_EXPORT) {
        let ExportBody::Validator(func) = &export.body else {
            return Err(kind_mismatch(column, &export.name, CallableKind::Validator, &export.body));
        };
        check(column, CallableKind::Validator, &export.name, &export.signature)?;
        column.validator = Some(func.clone());
    }
    Ok(())
}

fn check(
    column: &ColumnModule,
    kind: CallableKind,
    callable: &str,
    signature: &Signature,
) -> Result<(), PluginError> {
    check_column_signature(kind, signature).map_err(|violation| match violation {
        SignatureViolation::Missing(parameter) => PluginError::MissingParameter {
            field: column.field.clone(),
            kind,
            callable: callable.to_string(),
            parameter,
        },
        SignatureViolation::Unsupported(parameter) => PluginError::UnsupportedParameter {
            field: column.field.clone(),
            kind,
            callable: callable.to_string(),
            parameter,
        },
    })
}

fn kind_mismatch(
    column: &ColumnModule,
    callable: &str,
    expected: CallableKind,
    body: &ExportBody,
) -> PluginError {
    PluginError::ExportKindMismatch {
        field: column.field.clone(),
        callable: callable.to_string(),
        expected: expected.as_str(),
        found: body.kind_name(),
    }
}
