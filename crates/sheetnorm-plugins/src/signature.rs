//! Declared parameter lists and the per-role conformance rules.

use std::fmt;

/// Parameters every column callable may declare.
pub const BASE_PARAMETERS: [&str; 10] = [
    "job",
    "state",
    "field_name",
    "field_meta",
    "header",
    "column_values_sample",
    "column_values",
    "table",
    "column_index",
    "logger",
];

/// Parameters transformers and validators may declare on top of the base set.
pub const ROW_PARAMETERS: [&str; 3] = ["value", "row", "row_index"];

/// Keyword parameters a hook may declare.
pub const HOOK_KEYWORDS: [&str; 5] = ["job", "artifact", "events", "tables", "result"];

/// Sole parameter of a context-style hook.
pub const HOOK_CONTEXT_PARAMETER: &str = "context";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub has_default: bool,
}

/// The parameter list a callable declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
    accepts_kwargs: bool,
}

impl Signature {
    /// Signature with the given parameters, none of them defaulted.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: names
                .into_iter()
                .map(|name| Param {
                    name: name.into(),
                    has_default: false,
                })
                .collect(),
            accepts_kwargs: false,
        }
    }

    /// Signature that only takes a catch-all keyword parameter.
    pub fn kwargs() -> Self {
        Self {
            params: Vec::new(),
            accepts_kwargs: true,
        }
    }

    #[must_use]
    pub fn with_optional(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            has_default: true,
        });
        self
    }

    #[must_use]
    pub fn with_kwargs(mut self) -> Self {
        self.accepts_kwargs = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn accepts_kwargs(&self) -> bool {
        self.accepts_kwargs
    }

    pub fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// True when the only parameter is a required `context`.
    pub fn is_context_style(&self) -> bool {
        !self.accepts_kwargs
            && matches!(self.params.as_slice(), [only] if only.name == HOOK_CONTEXT_PARAMETER && !only.has_default)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.has_default {
                    format!("{}=…", p.name)
                } else {
                    p.name.clone()
                }
            })
            .collect();
        if self.accepts_kwargs {
            parts.push("**kwargs".to_string());
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// Role a column callable plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Detector,
    Transformer,
    Validator,
}

impl CallableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detector => "detector",
            Self::Transformer => "transformer",
            Self::Validator => "validator",
        }
    }

    pub fn required(self) -> &'static [&'static str] {
        match self {
            Self::Detector => &["field_name"],
            Self::Transformer => &["field_name", "value", "row"],
            Self::Validator => &["field_name", "value", "row_index"],
        }
    }

    pub fn allows(self, name: &str) -> bool {
        BASE_PARAMETERS.contains(&name)
            || (self != Self::Detector && ROW_PARAMETERS.contains(&name))
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureViolation {
    Missing(String),
    Unsupported(String),
}

/// Checks a column callable's signature against its role.
///
/// Catch-all keyword parameters satisfy every required name. Declared names
/// outside the allowed set are fine only when they carry a default.
pub fn check_column_signature(
    kind: CallableKind,
    signature: &Signature,
) -> Result<(), SignatureViolation> {
    for param in signature.params() {
        if !kind.allows(&param.name) && !param.has_default {
            return Err(SignatureViolation::Unsupported(param.name.clone()));
        }
    }
    if signature.accepts_kwargs() {
        return Ok(());
    }
    for required in kind.required() {
        if !signature.declares(required) {
            return Err(SignatureViolation::Missing((*required).to_string()));
        }
    }
    Ok(())
}

/// How a hook expects to be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCallStyle {
    /// A single `context` parameter.
    Context,
    /// Named context fields such as `job` or `tables`.
    Keywords,
}

/// Classifies a hook signature, returning the first offending parameter.
pub fn check_hook_signature(signature: &Signature) -> Result<HookCallStyle, String> {
    if signature.is_context_style() {
        return Ok(HookCallStyle::Context);
    }
    for param in signature.params() {
        if !HOOK_KEYWORDS.contains(&param.name.as_str()) && !param.has_default {
            return Err(param.name.clone());
        }
    }
    Ok(HookCallStyle::Keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_needs_field_name_unless_kwargs() {
        let missing = Signature::new(["header"]);
        assert_eq!(
            check_column_signature(CallableKind::Detector, &missing),
            Err(SignatureViolation::Missing("field_name".into()))
        );
        let kwargs = Signature::new(["header"]).with_kwargs();
        assert!(check_column_signature(CallableKind::Detector, &kwargs).is_ok());
    }

    #[test]
    fn detectors_may_not_take_row_parameters() {
        let sig = Signature::new(["field_name", "row"]);
        assert_eq!(
            check_column_signature(CallableKind::Detector, &sig),
            Err(SignatureViolation::Unsupported("row".into()))
        );
    }

    #[test]
    fn unknown_parameter_with_default_is_tolerated() {
        let sig = Signature::new(["field_name", "value", "row_index"]).with_optional("strict");
        assert!(check_column_signature(CallableKind::Validator, &sig).is_ok());
        let sig = Signature::new(["field_name", "value", "row_index", "strict"]);
        assert_eq!(
            check_column_signature(CallableKind::Validator, &sig),
            Err(SignatureViolation::Unsupported("strict".into()))
        );
    }

    #[test]
    fn kwargs_do_not_excuse_unsupported_names() {
        let sig = Signature::new(["db"]).with_kwargs();
        assert_eq!(
            check_column_signature(CallableKind::Transformer, &sig),
            Err(SignatureViolation::Unsupported("db".into()))
        );
    }

    #[test]
    fn hook_styles() {
        assert_eq!(
            check_hook_signature(&Signature::new(["context"])),
            Ok(HookCallStyle::Context)
        );
        assert_eq!(
            check_hook_signature(&Signature::new(["job", "result"])),
            Ok(HookCallStyle::Keywords)
        );
        assert_eq!(
            check_hook_signature(&Signature::kwargs()),
            Ok(HookCallStyle::Keywords)
        );
        assert_eq!(
            check_hook_signature(&Signature::new(["context", "job"])),
            Err("context".to_string())
        );
        assert_eq!(
            check_hook_signature(&Signature::new(["payload"])),
            Err("payload".to_string())
        );
    }

    #[test]
    fn display_marks_defaults_and_kwargs() {
        let sig = Signature::new(["field_name"]).with_optional("x").with_kwargs();
        assert_eq!(sig.to_string(), "(field_name, x=…, **kwargs)");
    }
}
