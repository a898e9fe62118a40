//! Terminal tables for command output.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use sheetnorm_core::Activation;
use sheetnorm_model::Severity;
use sheetnorm_plugins::ScriptPackage;
use sheetnorm_telemetry::{ArtifactNote, TableSummary};

use crate::commands::RunOutcome;

pub fn print_run_summary(outcome: &RunOutcome) {
    let result = &outcome.result;
    println!("Job: {}", result.job_id);
    println!("Status: {}", result.status);
    for path in &result.output_paths {
        println!("Output: {}", path.display());
    }
    println!("Artifact: {}", result.artifact_path.display());
    println!("Events: {}", result.events_path.display());
    if let Some(error) = &result.error {
        println!("Error: {error}");
    }
    if let Some(artifact) = &outcome.artifact {
        println!("{}", tables_table(&artifact.tables));
        let notes = notable_notes(&artifact.notes);
        if !notes.is_empty() {
            println!("{}", notes_table(&notes));
        }
    }
}

pub fn print_activation(activation: &Activation) {
    let model = &activation.manifest.model;
    println!("Manifest: {}", activation.manifest.origin);
    if let Some(title) = &model.info.title {
        println!("Title: {title}");
    }
    println!("SHA-256: {}", activation.manifest.sha256);
    println!("Hooks: {}", activation.hooks.len());
    println!("{}", fields_table(activation));
}

/// One row per extracted table.
pub fn tables_table(tables: &[TableSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Source"),
        header_cell("Header row"),
        header_cell("Rows"),
        header_cell("Mapped"),
        header_cell("Extras"),
        header_cell("Issues"),
    ]);
    apply_summary_table_style(&mut table);
    for index in [2, 3, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_rows = 0usize;
    let mut total_issues = 0usize;
    for summary in tables {
        total_rows += summary.row_count;
        total_issues += summary.issue_count;
        let source = match &summary.source_sheet {
            Some(sheet) => format!("{} [{sheet}]", summary.source_file),
            None => summary.source_file.clone(),
        };
        table.add_row(vec![
            Cell::new(&summary.sheet_name),
            Cell::new(source),
            Cell::new(summary.header_row_number),
            Cell::new(summary.row_count),
            Cell::new(summary.mapped.len()),
            count_cell(summary.extras.len(), Color::Yellow),
            count_cell(summary.issue_count, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell(format!("{} tables", tables.len())),
        dim_cell("-"),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        count_cell(total_issues, Color::Red),
    ]);
    table
}

pub fn notes_table(notes: &[&ArtifactNote]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Level"), header_cell("Message")]);
    apply_table_style(&mut table);
    for note in notes {
        table.add_row(vec![severity_cell(note.level), Cell::new(&note.message)]);
    }
    table
}

/// Manifest fields in column order.
pub fn fields_table(activation: &Activation) -> Table {
    let model = &activation.manifest.model;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Script"),
        header_cell("Required"),
        header_cell("Enabled"),
        header_cell("Synonyms"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);

    for field in model.column_order() {
        let Some(meta) = model.field(field) else {
            continue;
        };
        let label = match &meta.label {
            Some(label) => Cell::new(label),
            None => dim_cell("-"),
        };
        let script = match &meta.script {
            Some(script) => Cell::new(script),
            None => dim_cell("-"),
        };
        let name = if meta.enabled {
            Cell::new(field).add_attribute(Attribute::Bold)
        } else {
            dim_cell(field)
        };
        table.add_row(vec![
            name,
            label,
            script,
            flag_cell(meta.required),
            flag_cell(meta.enabled),
            Cell::new(meta.synonyms.join(", ")),
        ]);
    }
    table
}

/// Every export of every module in the package.
pub fn plugins_table(package: &ScriptPackage) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Module"),
        header_cell("Export"),
        header_cell("Kind"),
        header_cell("Signature"),
    ]);
    apply_table_style(&mut table);

    let mut modules: Vec<_> = package.modules().collect();
    modules.sort_by(|a, b| a.name().cmp(b.name()));
    for module in modules {
        for export in module.exports() {
            table.add_row(vec![
                Cell::new(module.name()),
                Cell::new(&export.name),
                dim_cell(export.body.kind_name()),
                Cell::new(export.signature.to_string()),
            ]);
        }
    }
    table
}

fn notable_notes(notes: &[ArtifactNote]) -> Vec<&ArtifactNote> {
    notes
        .iter()
        .filter(|note| note.level >= Severity::Warning)
        .collect()
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_cell(level: Severity) -> Cell {
    let color = match level {
        Severity::Debug | Severity::Info => Color::DarkGrey,
        Severity::Warning => Color::Yellow,
        Severity::Error | Severity::Critical => Color::Red,
    };
    Cell::new(level).fg(color)
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(Color::Green)
    } else {
        dim_cell("no")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
