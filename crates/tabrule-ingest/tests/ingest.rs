//! Tests for reading CSV files into datasets.

use std::io::Write;

use tabrule_ingest::{IngestError, read_csv_dataset};
use tabrule_model::{Dataset, Value};

fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn reads_header_and_typed_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "ledger.csv",
        "\u{feff}Account,Type,Amount\nA1,CR,100\nA1,DR,\"1,200.50\"\nA2, cr ,\n",
    );
    let dataset = read_csv_dataset(&path).unwrap();
    assert_eq!(dataset.columns, vec!["Account", "Type", "Amount"]);
    assert_eq!(dataset.height(), 3);
    assert_eq!(Dataset::cell(&dataset.rows[0], "Amount"), &Value::Number(100.0));
    assert_eq!(Dataset::cell(&dataset.rows[1], "Amount"), &Value::from("1,200.50"));
    assert_eq!(Dataset::cell(&dataset.rows[2], "Type"), &Value::from("cr"));
    assert_eq!(Dataset::cell(&dataset.rows[2], "Amount"), &Value::Null);
}

#[test]
fn account_numbers_with_leading_zeros_stay_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "accounts.csv", "Account,Amount\n000123,5\n");
    let dataset = read_csv_dataset(&path).unwrap();
    let row = &dataset.rows[0];
    assert_eq!(Dataset::cell(row, "Account"), &Value::from("000123"));
    assert_eq!(Dataset::cell(row, "Account").render(), "000123");
    assert_eq!(Dataset::cell(row, "Amount"), &Value::Number(5.0));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_csv_dataset(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { .. }));
}

#[test]
fn empty_file_has_no_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "empty.csv", "");
    let err = read_csv_dataset(&path).unwrap_err();
    assert!(matches!(err, IngestError::EmptyCsv { .. }));
}
