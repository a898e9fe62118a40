//! Script modules: named callables with declared signatures.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sheetnorm_model::{CanonicalRow, IssueReport};

use crate::args::{DetectorArgs, FieldScores, TransformArgs, ValidateArgs};
use crate::hooks::HookContext;
use crate::signature::Signature;

/// Exports whose name starts with this are detectors.
pub const DETECTOR_PREFIX: &str = "detect_";
pub const TRANSFORM_EXPORT: &str = "transform";
pub const VALIDATE_EXPORT: &str = "validate";
/// Hook entrypoints, in lookup order.
pub const HOOK_ENTRYPOINTS: [&str; 2] = ["run", "main"];

pub type DetectorFn = Arc<dyn Fn(DetectorArgs<'_>) -> anyhow::Result<FieldScores> + Send + Sync>;
pub type TransformFn =
    Arc<dyn Fn(TransformArgs<'_>) -> anyhow::Result<Option<CanonicalRow>> + Send + Sync>;
pub type ValidateFn =
    Arc<dyn Fn(ValidateArgs<'_>) -> anyhow::Result<Vec<IssueReport>> + Send + Sync>;
pub type HookFn = Arc<dyn Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum ExportBody {
    Detector(DetectorFn),
    Transformer(TransformFn),
    Validator(ValidateFn),
    Hook(HookFn),
}

impl ExportBody {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Detector(_) => "detector",
            Self::Transformer(_) => "transformer",
            Self::Validator(_) => "validator",
            Self::Hook(_) => "hook",
        }
    }
}

impl fmt::Debug for ExportBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportBody::{}", self.kind_name())
    }
}

#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub signature: Signature,
    pub body: ExportBody,
}

/// A named collection of callables, addressed by script reference.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    name: String,
    description: Option<String>,
    exports: BTreeMap<String, Export>,
}

impl ScriptModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            exports: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn export(mut self, name: impl Into<String>, signature: Signature, body: ExportBody) -> Self {
        let name = name.into();
        self.exports.insert(
            name.clone(),
            Export {
                name,
                signature,
                body,
            },
        );
        self
    }

    #[must_use]
    pub fn detector<F>(self, name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(DetectorArgs<'_>) -> anyhow::Result<FieldScores> + Send + Sync + 'static,
    {
        self.export(name, signature, ExportBody::Detector(Arc::new(f)))
    }

    #[must_use]
    pub fn transform<F>(self, signature: Signature, f: F) -> Self
    where
        F: Fn(TransformArgs<'_>) -> anyhow::Result<Option<CanonicalRow>> + Send + Sync + 'static,
    {
        self.export(TRANSFORM_EXPORT, signature, ExportBody::Transformer(Arc::new(f)))
    }

    #[must_use]
    pub fn validate<F>(self, signature: Signature, f: F) -> Self
    where
        F: Fn(ValidateArgs<'_>) -> anyhow::Result<Vec<IssueReport>> + Send + Sync + 'static,
    {
        self.export(VALIDATE_EXPORT, signature, ExportBody::Validator(Arc::new(f)))
    }

    #[must_use]
    pub fn hook<F>(self, name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&mut HookContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.export(name, signature, ExportBody::Hook(Arc::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Exports in name order.
    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.exports.values()
    }

    /// Exports following the detector naming convention, in name order.
    pub fn detector_exports(&self) -> impl Iterator<Item = &Export> {
        self.exports
            .values()
            .filter(|export| export.name.starts_with(DETECTOR_PREFIX))
    }
}
