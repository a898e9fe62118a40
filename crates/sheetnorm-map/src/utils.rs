//! Header normalization and output names for unmapped columns.

use std::collections::BTreeSet;

/// Longest output header allowed for an extra column.
pub const MAX_EXTRA_HEADER_LEN: usize = 31;

/// Trimmed and lowercased; the form detectors and fallback matching see.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lowercase with every run of non-alphanumerics collapsed to `_`.
pub fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Allocates unique output headers for unmapped columns within one table.
#[derive(Debug, Clone)]
pub struct ExtraHeaders {
    prefix: String,
    used: BTreeSet<String>,
}

impl ExtraHeaders {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            used: BTreeSet::new(),
        }
    }

    /// Output header for the column at 1-based `column_index`.
    pub fn allocate(&mut self, header: &str, column_index: usize) -> String {
        let slugged = slug(header);
        let stem = if slugged.is_empty() {
            format!("column_{column_index}")
        } else {
            slugged
        };
        let base = truncate_chars(&format!("{}{stem}", self.prefix), MAX_EXTRA_HEADER_LEN);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.used.contains(&candidate) {
            let suffix = format!("_{n}");
            let keep = MAX_EXTRA_HEADER_LEN.saturating_sub(suffix.chars().count());
            candidate = format!("{}{suffix}", truncate_chars(&base, keep));
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
