//! Structural validation of the raw manifest document.
//!
//! Runs before typed parsing so that every violation is reported with a JSON
//! pointer to the offending value instead of a serde position.

#![deny(unsafe_code)]

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{ManifestError, Result};
use crate::manifest::{HookStage, MANIFEST_SCHEMA_PREFIX, SCRIPT_API_VERSION};

const WRITER_MODES: [&str; 2] = ["row_streaming", "in_memory"];

pub fn validate_manifest_document(doc: &Value) -> Result<()> {
    let root = expect_object(doc, "")?;

    let api_version = require(root, "config_script_api_version", "")?;
    match api_version.as_str() {
        Some(SCRIPT_API_VERSION) => {}
        Some(other) => {
            return Err(ManifestError::invalid(
                "/config_script_api_version",
                format!("unsupported script API version '{other}' (expected '{SCRIPT_API_VERSION}')"),
            ));
        }
        None => {
            return Err(ManifestError::invalid(
                "/config_script_api_version",
                "expected a string",
            ));
        }
    }

    let info = expect_object(require(root, "info", "")?, "/info")?;
    let schema = expect_str(require(info, "schema", "/info")?, "/info/schema")?;
    if !schema.starts_with(MANIFEST_SCHEMA_PREFIX) {
        return Err(ManifestError::invalid(
            "/info/schema",
            format!("schema '{schema}' does not start with '{MANIFEST_SCHEMA_PREFIX}'"),
        ));
    }
    for key in ["title", "version", "description"] {
        optional_str(info, key, "/info")?;
    }

    let engine = expect_object(require(root, "engine", "")?, "/engine")?;
    validate_defaults(expect_object(
        require(engine, "defaults", "/engine")?,
        "/engine/defaults",
    )?)?;
    validate_writer(expect_object(
        require(engine, "writer", "/engine")?,
        "/engine/writer",
    )?)?;

    validate_hooks(expect_object(require(root, "hooks", "")?, "/hooks")?)?;

    let columns = expect_object(require(root, "columns", "")?, "/columns")?;
    validate_columns(columns)
}

fn validate_defaults(defaults: &Map<String, Value>) -> Result<()> {
    for key in ["timeout_ms", "memory_mb"] {
        if let Some(value) = present(defaults, key)
            && value.as_u64().is_none()
        {
            return Err(ManifestError::invalid(
                format!("/engine/defaults/{key}"),
                "expected a non-negative integer",
            ));
        }
    }
    if let Some(value) = present(defaults, "mapping_score_threshold") {
        let finite = value.as_f64().is_some_and(f64::is_finite);
        if !finite {
            return Err(ManifestError::invalid(
                "/engine/defaults/mapping_score_threshold",
                "expected a finite number",
            ));
        }
    }
    if let Some(value) = present(defaults, "detector_sample_size") {
        match value.as_u64() {
            Some(size) if size >= 1 => {}
            _ => {
                return Err(ManifestError::invalid(
                    "/engine/defaults/detector_sample_size",
                    "expected an integer >= 1",
                ));
            }
        }
    }
    Ok(())
}

fn validate_writer(writer: &Map<String, Value>) -> Result<()> {
    if let Some(mode) = optional_str(writer, "mode", "/engine/writer")?
        && !WRITER_MODES.contains(&mode)
    {
        return Err(ManifestError::invalid(
            "/engine/writer/mode",
            format!(
                "unknown writer mode '{mode}' (expected one of: {})",
                WRITER_MODES.join(", ")
            ),
        ));
    }
    optional_bool(writer, "append_unmapped_columns", "/engine/writer")?;
    optional_str(writer, "unmapped_prefix", "/engine/writer")?;
    if let Some(sheet) = optional_str(writer, "output_sheet", "/engine/writer")?
        && sheet.trim().is_empty()
    {
        return Err(ManifestError::invalid(
            "/engine/writer/output_sheet",
            "output sheet name must not be empty",
        ));
    }
    Ok(())
}

fn validate_hooks(hooks: &Map<String, Value>) -> Result<()> {
    for (stage, refs) in hooks {
        let pointer = format!("/hooks/{}", escape(stage));
        if HookStage::parse(stage).is_none() {
            return Err(ManifestError::invalid(
                pointer,
                format!("unknown hook stage '{stage}'"),
            ));
        }
        let Some(refs) = refs.as_array() else {
            return Err(ManifestError::invalid(pointer, "expected an array"));
        };
        for (idx, hook) in refs.iter().enumerate() {
            let hook_pointer = format!("{pointer}/{idx}");
            let hook = expect_object(hook, &hook_pointer)?;
            let script = expect_str(
                require(hook, "script", &hook_pointer)?,
                &format!("{hook_pointer}/script"),
            )?;
            if script.trim().is_empty() {
                return Err(ManifestError::invalid(
                    format!("{hook_pointer}/script"),
                    "script reference must not be empty",
                ));
            }
            optional_bool(hook, "enabled", &hook_pointer)?;
        }
    }
    Ok(())
}

fn validate_columns(columns: &Map<String, Value>) -> Result<()> {
    let Some(order) = require(columns, "order", "/columns")?.as_array() else {
        return Err(ManifestError::invalid("/columns/order", "expected an array"));
    };
    let meta = expect_object(require(columns, "meta", "/columns")?, "/columns/meta")?;

    let mut seen = BTreeSet::new();
    for (idx, entry) in order.iter().enumerate() {
        let pointer = format!("/columns/order/{idx}");
        let field = expect_str(entry, &pointer)?;
        if field.trim().is_empty() {
            return Err(ManifestError::invalid(pointer, "field id must not be empty"));
        }
        if !seen.insert(field) {
            return Err(ManifestError::invalid(
                pointer,
                format!("duplicate field id '{field}'"),
            ));
        }
        if !meta.contains_key(field) {
            return Err(ManifestError::invalid(
                pointer,
                format!("field '{field}' has no entry in columns.meta"),
            ));
        }
    }

    for (field, entry) in meta {
        let pointer = format!("/columns/meta/{}", escape(field));
        if !seen.contains(field.as_str()) {
            return Err(ManifestError::invalid(
                pointer,
                format!("field '{field}' is not listed in columns.order"),
            ));
        }
        let entry = expect_object(entry, &pointer)?;
        optional_str(entry, "label", &pointer)?;
        optional_str(entry, "type_hint", &pointer)?;
        if let Some(script) = optional_str(entry, "script", &pointer)?
            && script.trim().is_empty()
        {
            return Err(ManifestError::invalid(
                format!("{pointer}/script"),
                "script reference must not be empty",
            ));
        }
        optional_bool(entry, "required", &pointer)?;
        optional_bool(entry, "enabled", &pointer)?;
        if let Some(synonyms) = present(entry, "synonyms") {
            let Some(items) = synonyms.as_array() else {
                return Err(ManifestError::invalid(
                    format!("{pointer}/synonyms"),
                    "expected an array of strings",
                ));
            };
            for (idx, item) in items.iter().enumerate() {
                expect_str(item, &format!("{pointer}/synonyms/{idx}"))?;
            }
        }
    }
    Ok(())
}

fn expect_object<'a>(value: &'a Value, pointer: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ManifestError::invalid(display_pointer(pointer), "expected an object"))
}

fn expect_str<'a>(value: &'a Value, pointer: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ManifestError::invalid(display_pointer(pointer), "expected a string"))
}

fn require<'a>(map: &'a Map<String, Value>, key: &str, parent: &str) -> Result<&'a Value> {
    map.get(key).ok_or_else(|| {
        ManifestError::invalid(
            display_pointer(parent),
            format!("missing required key '{key}'"),
        )
    })
}

/// Returns the value when the key exists and is not `null`.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn optional_str<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    parent: &str,
) -> Result<Option<&'a str>> {
    match present(map, key) {
        None => Ok(None),
        Some(value) => expect_str(value, &format!("{parent}/{key}")).map(Some),
    }
}

fn optional_bool(map: &Map<String, Value>, key: &str, parent: &str) -> Result<Option<bool>> {
    match present(map, key) {
        None => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| {
            ManifestError::invalid(format!("{parent}/{key}"), "expected a boolean")
        }),
    }
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn display_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "config_script_api_version": "1",
            "info": {"schema": "sheetnorm.manifest/v1.0"},
            "engine": {"defaults": {}, "writer": {}},
            "hooks": {},
            "columns": {"order": ["email"], "meta": {"email": {"label": "Email"}}}
        })
    }

    fn pointer_of(err: ManifestError) -> String {
        match err {
            ManifestError::Invalid { pointer, .. } => pointer,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_minimal_document() {
        validate_manifest_document(&minimal()).expect("valid");
    }

    #[test]
    fn rejects_foreign_schema_tag() {
        let mut doc = minimal();
        doc["info"]["schema"] = json!("other.manifest/v1");
        let err = validate_manifest_document(&doc).unwrap_err();
        assert_eq!(pointer_of(err), "/info/schema");
    }

    #[test]
    fn rejects_duplicate_order_entries() {
        let mut doc = minimal();
        doc["columns"]["order"] = json!(["email", "email"]);
        let err = validate_manifest_document(&doc).unwrap_err();
        assert!(err.to_string().contains("duplicate field id 'email'"));
        assert_eq!(pointer_of(err), "/columns/order/1");
    }

    #[test]
    fn rejects_unknown_hook_stage() {
        let mut doc = minimal();
        doc["hooks"] = json!({"on_lunch": []});
        let err = validate_manifest_document(&doc).unwrap_err();
        assert_eq!(pointer_of(err), "/hooks/on_lunch");
    }

    #[test]
    fn rejects_zero_sample_size() {
        let mut doc = minimal();
        doc["engine"]["defaults"]["detector_sample_size"] = json!(0);
        let err = validate_manifest_document(&doc).unwrap_err();
        assert_eq!(pointer_of(err), "/engine/defaults/detector_sample_size");
    }

    #[test]
    fn missing_key_points_at_parent() {
        let mut doc = minimal();
        doc.as_object_mut().expect("object").remove("hooks");
        let err = validate_manifest_document(&doc).unwrap_err();
        assert!(err.to_string().contains("missing required key 'hooks'"));
        assert_eq!(pointer_of(err), "/");
    }
}
