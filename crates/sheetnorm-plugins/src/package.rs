//! Catalog of script modules addressed by path-like references.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::PluginError;
use crate::module::ScriptModule;

const SCRIPT_EXTENSIONS: [&str; 2] = [".py", ".rs"];

#[derive(Debug, Clone, Default)]
pub struct ScriptPackage {
    modules: BTreeMap<String, Arc<ScriptModule>>,
}

impl ScriptPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under its normalized name.
    pub fn register(&mut self, mut module: ScriptModule) -> Result<(), PluginError> {
        let key = normalize_script_ref(module.name())?;
        if self.modules.contains_key(&key) {
            return Err(PluginError::DuplicateModule { module: key });
        }
        module.rename(key.clone());
        self.modules.insert(key, Arc::new(module));
        Ok(())
    }

    /// Copies every module of `other` into this package.
    pub fn extend(&mut self, other: &ScriptPackage) -> Result<(), PluginError> {
        for (key, module) in &other.modules {
            if self.modules.contains_key(key) {
                return Err(PluginError::DuplicateModule {
                    module: key.clone(),
                });
            }
            self.modules.insert(key.clone(), Arc::clone(module));
        }
        Ok(())
    }

    /// Looks up a module; `Ok(None)` when the reference is well-formed but unknown.
    pub fn resolve(&self, script_ref: &str) -> Result<Option<Arc<ScriptModule>>, PluginError> {
        let key = normalize_script_ref(script_ref)?;
        Ok(self.modules.get(&key).cloned())
    }

    pub fn modules(&self) -> impl Iterator<Item = &ScriptModule> {
        self.modules.values().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Canonical key for a script reference.
///
/// `./columns\email.py` and `columns/email` name the same module. Absolute
/// paths and `..` segments are rejected.
pub fn normalize_script_ref(raw: &str) -> Result<String, PluginError> {
    let invalid = |message: &str| PluginError::InvalidScriptRef {
        script: raw.to_string(),
        message: message.to_string(),
    };
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    if path.is_empty() {
        return Err(invalid("reference is empty"));
    }
    if path.starts_with('/') || path.chars().nth(1) == Some(':') {
        return Err(invalid("reference must be relative"));
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(invalid("reference must not leave the package")),
            other => segments.push(other),
        }
    }
    let mut key = segments.join("/");
    for ext in SCRIPT_EXTENSIONS {
        if let Some(stem) = key.strip_suffix(ext)
            && !stem.is_empty()
            && !stem.ends_with('/')
        {
            key = stem.to_string();
            break;
        }
    }
    Ok(key)
}
