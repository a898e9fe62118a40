//! Built-in script modules shipped with the engine.
//!
//! Manifests reference them as `builtin/text.py`, `builtin/email.py`,
//! `builtin/number.py` and `builtin/date.py`; the `builtin/hooks/table_summary`
//! hook notes per-table counts after extraction.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use rapidfuzz::distance::jaro_winkler;
use regex::Regex;
use serde_json::{Map, Number, Value, json};
use sheetnorm_model::{CanonicalRow, ColumnMeta, IssueReport, Severity};

use crate::args::{DetectorArgs, FieldScores, TransformArgs, ValidateArgs, score_for};
use crate::error::PluginError;
use crate::hooks::HookContext;
use crate::module::ScriptModule;
use crate::package::ScriptPackage;
use crate::signature::Signature;

/// Minimum Jaro-Winkler similarity for a fuzzy header match.
const HEADER_SIMILARITY_FLOOR: f64 = 0.85;
/// Weight of a fuzzy (non-exact) header match.
const FUZZY_HEADER_WEIGHT: f64 = 0.8;
/// Weight of the value-shape signal relative to the header signal.
const VALUE_WEIGHT: f64 = 0.6;

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y", "%d-%b-%Y",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Package holding every built-in module.
pub fn builtin_package() -> Result<ScriptPackage, PluginError> {
    let mut package = ScriptPackage::new();
    package.register(text_module())?;
    package.register(email_module())?;
    package.register(number_module())?;
    package.register(date_module())?;
    package.register(table_summary_hook())?;
    Ok(package)
}

fn header_signature() -> Signature {
    Signature::new(["field_name", "field_meta", "header"]).with_kwargs()
}

fn values_signature() -> Signature {
    Signature::new(["field_name", "column_values_sample"]).with_kwargs()
}

fn transform_signature() -> Signature {
    Signature::new(["field_name", "value", "row"]).with_kwargs()
}

fn validate_signature() -> Signature {
    Signature::new(["field_name", "field_meta", "value", "row_index"]).with_kwargs()
}

fn text_module() -> ScriptModule {
    ScriptModule::new("builtin/text.py")
        .describe("Free text: header matching, whitespace cleanup, required check")
        .detector("detect_header", header_signature(), detect_header)
        .transform(transform_signature(), |args: TransformArgs<'_>| {
            let TransformArgs {
                field_name,
                value,
                row,
                ..
            } = args;
            if let Value::String(text) = &value {
                row.insert(field_name.to_string(), collapse_whitespace(text));
            }
            Ok(None)
        })
        .validate(validate_signature(), |args: ValidateArgs<'_>| {
            Ok(required_issue(args.field_meta, args.value).into_iter().collect())
        })
}

fn email_module() -> ScriptModule {
    ScriptModule::new("builtin/email.py")
        .describe("Email addresses: header and value detection, lowercasing")
        .detector("detect_header", header_signature(), detect_header)
        .detector("detect_values", values_signature(), |args: DetectorArgs<'_>| {
            let ratio = match_ratio(args.column_values_sample, |text| EMAIL_RE.is_match(text));
            Ok(score_for(args.field_name, ratio * VALUE_WEIGHT))
        })
        .transform(transform_signature(), |args: TransformArgs<'_>| {
            Ok(match &args.value {
                Value::String(text) => Some(update(
                    args.field_name,
                    Value::String(text.trim().to_lowercase()),
                )),
                _ => None,
            })
        })
        .validate(validate_signature(), |args: ValidateArgs<'_>| {
            if let Some(issue) = required_issue(args.field_meta, args.value) {
                return Ok(vec![issue]);
            }
            let mut issues = Vec::new();
            if let Some(text) = non_blank_text(args.value)
                && !EMAIL_RE.is_match(&text)
            {
                issues.push(
                    IssueReport::new("invalid_email")
                        .with_message(format!("'{text}' is not a valid email address"))
                        .with_detail("value", text),
                );
            }
            Ok(issues)
        })
}

fn number_module() -> ScriptModule {
    ScriptModule::new("builtin/number.py")
        .describe("Numbers: header and value detection, separator stripping")
        .detector("detect_header", header_signature(), detect_header)
        .detector("detect_values", values_signature(), |args: DetectorArgs<'_>| {
            let ratio = value_ratio(args.column_values_sample, |value| parse_number(value).is_some());
            Ok(score_for(args.field_name, ratio * VALUE_WEIGHT))
        })
        .transform(transform_signature(), |args: TransformArgs<'_>| {
            Ok(match &args.value {
                Value::String(_) => parse_number(&args.value).map(|n| update(args.field_name, n)),
                _ => None,
            })
        })
        .validate(validate_signature(), |args: ValidateArgs<'_>| {
            if let Some(issue) = required_issue(args.field_meta, args.value) {
                return Ok(vec![issue]);
            }
            let mut issues = Vec::new();
            if let Some(text) = non_blank_text(args.value) {
                issues.push(
                    IssueReport::new("not_numeric")
                        .with_message(format!("'{text}' is not a number"))
                        .with_detail("value", text),
                );
            }
            Ok(issues)
        })
}

fn date_module() -> ScriptModule {
    ScriptModule::new("builtin/date.py")
        .describe("Dates: header and value detection, ISO 8601 normalization")
        .detector("detect_header", header_signature(), detect_header)
        .detector("detect_values", values_signature(), |args: DetectorArgs<'_>| {
            let ratio = match_ratio(args.column_values_sample, |text| parse_date_text(text).is_some());
            Ok(score_for(args.field_name, ratio * VALUE_WEIGHT))
        })
        .transform(transform_signature(), |args: TransformArgs<'_>| {
            Ok(parse_date(&args.value)
                .map(|date| update(args.field_name, Value::String(date.format("%Y-%m-%d").to_string()))))
        })
        .validate(validate_signature(), |args: ValidateArgs<'_>| {
            if let Some(issue) = required_issue(args.field_meta, args.value) {
                return Ok(vec![issue]);
            }
            let mut issues = Vec::new();
            let blank = is_blank(args.value);
            if !blank && parse_date(args.value).is_none() {
                issues.push(
                    IssueReport::new("invalid_date")
                        .with_message(format!("{} is not a recognizable date", args.value))
                        .with_detail("value", args.value.clone()),
                );
            }
            Ok(issues)
        })
}

fn table_summary_hook() -> ScriptModule {
    ScriptModule::new("builtin/hooks/table_summary.py")
        .describe("Notes row and issue counts for every extracted table")
        .hook("run", Signature::new(["context"]), |ctx: &mut HookContext<'_>| {
            let tables: Vec<Value> = ctx
                .tables()
                .iter()
                .map(|table| {
                    json!({
                        "sheet_name": table.sheet_name,
                        "rows": table.row_count(),
                        "issues": table.validation_issues.len(),
                    })
                })
                .collect();
            let mut details = Map::new();
            details.insert("tables".to_string(), Value::Array(tables));
            let message = format!("{} table(s) extracted", ctx.tables().len());
            ctx.note(Severity::Info, &message, details);
            Ok(())
        })
}

/// Scores a header against the field id, its label and synonyms.
fn detect_header(args: DetectorArgs<'_>) -> anyhow::Result<FieldScores> {
    let header = normalize_name(args.header);
    if header.is_empty() {
        return Ok(FieldScores::new());
    }
    let best = candidate_names(args.field_name, args.field_meta)
        .map(|candidate| {
            if candidate == header {
                1.0
            } else {
                jaro_winkler::similarity(header.chars(), candidate.chars())
            }
        })
        .fold(0.0_f64, f64::max);
    let delta = if best >= 1.0 {
        1.0
    } else if best >= HEADER_SIMILARITY_FLOOR {
        best * FUZZY_HEADER_WEIGHT
    } else {
        0.0
    };
    Ok(score_for(args.field_name, delta))
}

fn candidate_names<'a>(field: &'a str, meta: &'a ColumnMeta) -> impl Iterator<Item = String> + 'a {
    std::iter::once(field)
        .chain(meta.label.as_deref())
        .chain(meta.synonyms.iter().map(String::as_str))
        .map(normalize_name)
        .filter(|name| !name.is_empty())
}

/// Lowercase, with runs of non-alphanumerics collapsed to one space.
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(text: &str) -> Value {
    Value::String(WHITESPACE_RE.replace_all(text.trim(), " ").into_owned())
}

fn update(field: &str, value: Value) -> CanonicalRow {
    CanonicalRow::from([(field.to_string(), value)])
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn non_blank_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

fn required_issue(meta: &ColumnMeta, value: &Value) -> Option<IssueReport> {
    (meta.required && is_blank(value)).then(|| {
        IssueReport::new("required_missing")
            .with_severity(Severity::Error)
            .with_message("required value is missing")
    })
}

/// Share of non-blank sample values satisfying `predicate`.
fn value_ratio(sample: &[Value], predicate: impl Fn(&Value) -> bool) -> f64 {
    let present: Vec<&Value> = sample.iter().filter(|value| !is_blank(value)).collect();
    if present.is_empty() {
        return 0.0;
    }
    let hits = present.iter().filter(|value| predicate(value)).count();
    hits as f64 / present.len() as f64
}

/// Like [`value_ratio`], over the text rendering of each value.
fn match_ratio(sample: &[Value], predicate: impl Fn(&str) -> bool) -> f64 {
    value_ratio(sample, |value| match value {
        Value::String(text) => predicate(text.trim()),
        other => predicate(&other.to_string()),
    })
}

/// Parses numbers written with thousands separators or a currency sign.
fn parse_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .trim_start_matches(['$', '€', '£'])
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            if let Ok(int) = cleaned.parse::<i64>() {
                return Some(Value::from(int));
            }
            let float = cleaned.parse::<f64>().ok()?;
            Number::from_f64(float).map(Value::Number)
        }
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => parse_date_text(text.trim()),
        // Spreadsheet serial date.
        Value::Number(number) => {
            let serial = number.as_f64()?;
            if !(1.0..=2_958_465.0).contains(&serial) {
                return None;
            }
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
        }
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let date_part = text
        .split_once(['T', ' '])
        .map_or(text, |(date, _)| date);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}
