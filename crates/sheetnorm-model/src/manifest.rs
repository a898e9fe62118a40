//! Typed manifest model.
//!
//! A manifest is loaded once per job through [`LoadedManifest`], which runs
//! the structural checks in [`crate::schema`] before the JSON is turned into
//! the types below. Nothing in here is mutated after loading.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ManifestError, Result};
use crate::schema::validate_manifest_document;

/// Version tag every `info.schema` value must start with.
pub const MANIFEST_SCHEMA_PREFIX: &str = "sheetnorm.manifest/v1";

/// The only script API version this engine understands.
pub const SCRIPT_API_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub config_script_api_version: String,
    pub info: ManifestInfo,
    pub engine: EngineConfig,
    pub hooks: HookConfig,
    pub columns: ColumnsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestInfo {
    pub schema: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub defaults: EngineDefaults,
    pub writer: WriterConfig,
}

/// Engine-wide knobs.
///
/// `timeout_ms` and `memory_mb` are carried for external supervisors and are
/// not enforced by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDefaults {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub mapping_score_threshold: f64,
    #[serde(default = "default_sample_size")]
    pub detector_sample_size: usize,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            memory_mb: None,
            mapping_score_threshold: 0.0,
            detector_sample_size: default_sample_size(),
        }
    }
}

fn default_sample_size() -> usize {
    64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterMode {
    #[default]
    RowStreaming,
    InMemory,
}

impl WriterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RowStreaming => "row_streaming",
            Self::InMemory => "in_memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    #[serde(default)]
    pub mode: WriterMode,
    #[serde(default = "default_true")]
    pub append_unmapped_columns: bool,
    #[serde(default = "default_unmapped_prefix")]
    pub unmapped_prefix: String,
    #[serde(default)]
    pub output_sheet: Option<String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            mode: WriterMode::default(),
            append_unmapped_columns: true,
            unmapped_prefix: default_unmapped_prefix(),
            output_sheet: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_unmapped_prefix() -> String {
    "raw_".to_string()
}

/// Lifecycle stages a hook can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    OnActivate,
    OnJobStart,
    OnAfterExtract,
    OnBeforeSave,
    OnJobEnd,
}

impl HookStage {
    pub const ALL: [HookStage; 5] = [
        HookStage::OnActivate,
        HookStage::OnJobStart,
        HookStage::OnAfterExtract,
        HookStage::OnBeforeSave,
        HookStage::OnJobEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnActivate => "on_activate",
            Self::OnJobStart => "on_job_start",
            Self::OnAfterExtract => "on_after_extract",
            Self::OnBeforeSave => "on_before_save",
            Self::OnJobEnd => "on_job_end",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == name)
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRef {
    pub script: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub on_activate: Vec<HookRef>,
    #[serde(default)]
    pub on_job_start: Vec<HookRef>,
    #[serde(default)]
    pub on_after_extract: Vec<HookRef>,
    #[serde(default)]
    pub on_before_save: Vec<HookRef>,
    #[serde(default)]
    pub on_job_end: Vec<HookRef>,
}

impl HookConfig {
    pub fn refs(&self, stage: HookStage) -> &[HookRef] {
        match stage {
            HookStage::OnActivate => &self.on_activate,
            HookStage::OnJobStart => &self.on_job_start,
            HookStage::OnAfterExtract => &self.on_after_extract,
            HookStage::OnBeforeSave => &self.on_before_save,
            HookStage::OnJobEnd => &self.on_job_end,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub order: Vec<String>,
    pub meta: BTreeMap<String, ColumnMeta>,
}

/// Per-field metadata from `columns.meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub label: Option<String>,
    /// Script reference; a field without one only maps via label/synonyms.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub type_hint: Option<String>,
}

impl Manifest {
    pub fn column_order(&self) -> &[String] {
        &self.columns.order
    }

    pub fn field(&self, field: &str) -> Option<&ColumnMeta> {
        self.columns.meta.get(field)
    }

    /// Position of a field in `columns.order`.
    pub fn field_position(&self, field: &str) -> Option<usize> {
        self.columns.order.iter().position(|id| id == field)
    }

    /// Enabled fields in manifest order.
    pub fn eligible_fields(&self) -> impl Iterator<Item = (&str, &ColumnMeta)> {
        self.columns.order.iter().filter_map(|id| {
            self.columns
                .meta
                .get(id)
                .filter(|meta| meta.enabled)
                .map(|meta| (id.as_str(), meta))
        })
    }

    /// Output header labels for `columns.order`, falling back to the field id.
    pub fn labels(&self) -> Vec<String> {
        self.columns
            .order
            .iter()
            .map(|id| {
                self.columns
                    .meta
                    .get(id)
                    .and_then(|meta| meta.label.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect()
    }

    pub fn defaults(&self) -> &EngineDefaults {
        &self.engine.defaults
    }

    pub fn writer(&self) -> &WriterConfig {
        &self.engine.writer
    }
}

/// A manifest as loaded from disk: raw JSON plus the typed model.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub raw: Value,
    pub model: Manifest,
    pub origin: String,
    pub path: Option<PathBuf>,
    pub sha256: String,
}

impl LoadedManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut loaded = Self::from_slice(&bytes, &path.display().to_string())?;
        loaded.path = Some(path.to_path_buf());
        Ok(loaded)
    }

    pub fn from_json_str(text: &str, origin: &str) -> Result<Self> {
        Self::from_slice(text.as_bytes(), origin)
    }

    fn from_slice(bytes: &[u8], origin: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_slice(bytes).map_err(|source| ManifestError::Malformed {
                origin: origin.to_string(),
                source,
            })?;
        validate_manifest_document(&raw)?;
        let model: Manifest = serde_json::from_value(raw.clone())
            .map_err(|e| ManifestError::invalid("/", e.to_string()))?;
        Ok(Self {
            raw,
            model,
            origin: origin.to_string(),
            path: None,
            sha256: hex::encode(Sha256::digest(bytes)),
        })
    }
}
