//! Workbook sheet-name allocation.

use std::collections::BTreeSet;

/// Longest sheet name a workbook accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Name used when nothing usable survives sanitizing.
pub const FALLBACK_SHEET_NAME: &str = "Sheet";

/// Reduces `raw` to ASCII alphanumerics and `_`, at most 31 characters.
///
/// Runs of other characters become a single `_`; leading and trailing `_`
/// are dropped.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return FALLBACK_SHEET_NAME.to_string();
    }
    trimmed.chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Base sheet name for an input table: the file stem for CSV, and
/// `<stem>_<sheet>` for a workbook sheet.
pub fn table_sheet_base(stem: &str, source_sheet: Option<&str>) -> String {
    match source_sheet {
        Some(sheet) => format!("{stem}_{sheet}"),
        None => stem.to_string(),
    }
}

/// Hands out unique sheet names within one workbook.
///
/// Names compare case-insensitively; a clash gets `_2`, `_3`… with the base
/// shortened so the result still fits.
#[derive(Debug, Clone, Default)]
pub struct SheetNameAllocator {
    taken: BTreeSet<String>,
}

impl SheetNameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.claim(&base) {
            return base;
        }
        let mut counter = 2usize;
        loop {
            let suffix = format!("_{counter}");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
            let candidate = format!("{}{suffix}", &base[..base.len().min(keep)]);
            if self.claim(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_ascii_lowercase())
    }

    fn claim(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_ascii_lowercase())
    }
}
