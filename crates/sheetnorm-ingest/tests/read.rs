use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;
use serde_json::{Value, json};
use sheetnorm_ingest::{
    IngestError, InputFormat, list_input_files, read_csv_table, read_input,
};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write file");
}

fn write_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook
            .add_worksheet()
            .set_name("Members")
            .expect("sheet name");
        sheet.write_string(0, 0, "Name").expect("cell");
        sheet.write_string(0, 1, "Age").expect("cell");
        sheet.write_string(1, 0, "Ada").expect("cell");
        sheet.write_number(1, 1, 36).expect("cell");
        sheet.write_string(2, 0, "Alan").expect("cell");
        sheet.write_number(2, 1, 41.5).expect("cell");
    }
    {
        let sheet = workbook.add_worksheet().set_name("Notes").expect("sheet name");
        sheet.write_string(0, 0, "Text").expect("cell");
        sheet.write_string(1, 0, "hello").expect("cell");
    }
    workbook.add_worksheet().set_name("Empty").expect("sheet name");
    workbook.save(path).expect("save workbook");
}

#[test]
fn discovery_lists_supported_inputs_sorted() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "b.csv", "A\n1\n");
    write(dir.path(), "a.XLSX", "");
    write(dir.path(), "notes.txt", "ignored");
    write(dir.path(), "~$a.xlsx", "");
    write(dir.path(), ".hidden.csv", "A\n1\n");
    fs::create_dir(dir.path().join("nested.csv")).expect("dir");

    let files = list_input_files(dir.path()).expect("list");
    let names: Vec<String> = files.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["a.XLSX", "b.csv"]);
    assert_eq!(files[0].format, InputFormat::Workbook);
    assert_eq!(files[1].stem(), "b");
}

#[test]
fn missing_input_directory_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = list_input_files(&dir.path().join("input")).unwrap_err();
    assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
}

#[test]
fn csv_reads_header_and_padded_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "contacts.csv",
        "\n Name , E-Mail ,Notes\nAda,ada@example.com\n,,\nAlan,alan@example.com,likes tea\n",
    );
    let table = read_csv_table(&dir.path().join("contacts.csv")).expect("read");
    assert_eq!(table.source_file, "contacts.csv");
    assert_eq!(table.source_sheet, None);
    assert_eq!(table.headers, vec!["Name", "E-Mail", "Notes"]);
    assert_eq!(table.header_row_number, 2);
    assert_eq!(table.row_numbers, vec![3, 5]);
    assert_eq!(
        table.rows,
        vec![
            vec![json!("Ada"), json!("ada@example.com"), Value::Null],
            vec![json!("Alan"), json!("alan@example.com"), json!("likes tea")],
        ]
    );
    let columns = table.columns();
    assert_eq!(columns[2], vec![Value::Null, json!("likes tea")]);
    assert_eq!(table.info().row_count, 2);
}

#[test]
fn csv_keeps_every_row_below_the_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "members.csv",
        "Member Name,Status\nada,active\nbob,\ncarol,inactive",
    );
    let table = read_csv_table(&dir.path().join("members.csv")).expect("read");
    assert_eq!(table.headers, vec!["Member Name", "Status"]);
    assert_eq!(table.header_row_number, 1);
    assert_eq!(
        table.rows,
        vec![
            vec![json!("ada"), json!("active")],
            vec![json!("bob"), Value::Null],
            vec![json!("carol"), json!("inactive")],
        ]
    );
    assert_eq!(table.row_numbers, vec![2, 3, 4]);
}

#[test]
fn csv_row_numbers_follow_blank_lines() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "gaps.csv", "\r\n\r\nA,B\r\n1,2\r\n\r\n3,4\r\n");
    let table = read_csv_table(&dir.path().join("gaps.csv")).expect("read");
    assert_eq!(table.header_row_number, 3);
    assert_eq!(table.row_numbers, vec![4, 6]);
}

#[test]
fn workbook_sheets_become_tables() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("members.xlsx");
    write_workbook(&path);
    let files = list_input_files(dir.path()).expect("list");

    let tables = read_input(&files[0], None).expect("read workbook");
    let sheets: Vec<Option<&str>> = tables.iter().map(|t| t.source_sheet.as_deref()).collect();
    assert_eq!(sheets, vec![Some("Members"), Some("Notes")]);
    assert_eq!(tables[0].headers, vec!["Name", "Age"]);
    assert_eq!(
        tables[0].rows,
        vec![vec![json!("Ada"), json!(36)], vec![json!("Alan"), json!(41.5)]]
    );
    assert_eq!(tables[0].header_row_number, 1);
    assert_eq!(tables[0].row_numbers, vec![2, 3]);
}

#[test]
fn workbook_sheet_filter_applies() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("members.xlsx");
    write_workbook(&path);
    let files = list_input_files(dir.path()).expect("list");

    let wanted = vec!["Notes".to_string()];
    let tables = read_input(&files[0], Some(wanted.as_slice())).expect("filtered");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].source_sheet.as_deref(), Some("Notes"));

    let unknown = vec!["Payments".to_string()];
    let err = read_input(&files[0], Some(unknown.as_slice())).unwrap_err();
    assert!(matches!(err, IngestError::SheetFilterUnmatched { .. }));
}

#[test]
fn csv_ignores_sheet_filter() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "plain.csv", "A,B\n1,2\n");
    let files = list_input_files(dir.path()).expect("list");
    let wanted = vec!["Payments".to_string()];
    let tables = read_input(&files[0], Some(wanted.as_slice())).expect("csv");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].rows, vec![vec![json!("1"), json!("2")]]);
}
