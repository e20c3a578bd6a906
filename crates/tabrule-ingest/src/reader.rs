//! CSV files to datasets.
//!
//! The first record is the header. Cells are trimmed; empty cells become
//! nulls and plain decimal literals become numbers. Everything else is kept
//! as text, so typing beyond that is left to schema inference.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tabrule_model::{Dataset, Value, parse_f64};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Interpret one raw CSV cell.
///
/// Only plain decimals (`-12`, `0.5`, `1200.25`) become numbers. Text such
/// as `000123`, `+5` or `1e3` would not survive the round trip through
/// `f64`, so it stays text.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match parse_f64(trimmed).filter(|_| is_plain_decimal(trimmed)) {
        Some(number) => Value::Number(number),
        None => Value::Text(trimmed.to_string()),
    }
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?`
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, fraction) = match unsigned.split_once('.') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(int_part)
        && (int_part == "0" || !int_part.starts_with('0'))
        && fraction.is_none_or(digits)
}

/// Read a CSV file into a [`Dataset`].
pub fn read_csv_dataset(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let dataset = read_csv_from_reader(file, path)?;
    debug!(
        path = %path.display(),
        rows = dataset.height(),
        columns = dataset.width(),
        "loaded csv"
    );
    Ok(dataset)
}

/// Read CSV from any reader. `path` is only used in error messages.
pub fn read_csv_from_reader<R: Read>(reader: R, path: &Path) -> Result<Dataset> {
    let csv_error = |source| IngestError::CsvParse {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(ToString::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(IngestError::DuplicateColumn {
            column: duplicate.clone(),
            path: path.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        records.push(record.iter().map(parse_cell).collect());
    }
    Ok(Dataset::from_records(&headers, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_typed_minimally() {
        assert_eq!(parse_cell("  "), Value::Null);
        assert_eq!(parse_cell("12.50"), Value::Number(12.5));
        assert_eq!(parse_cell("-3"), Value::Number(-3.0));
        assert_eq!(parse_cell("$1,200"), Value::from("$1,200"));
        assert_eq!(parse_cell(" CR "), Value::from("CR"));
        assert_eq!(parse_cell("0.75"), Value::Number(0.75));
    }

    #[test]
    fn identifiers_keep_their_digits() {
        assert_eq!(parse_cell("000123"), Value::from("000123"));
        assert_eq!(parse_cell("-007"), Value::from("-007"));
        assert_eq!(parse_cell("+5"), Value::from("+5"));
        assert_eq!(parse_cell("1e3"), Value::from("1e3"));
        assert_eq!(parse_cell("12."), Value::from("12."));
        assert_eq!(parse_cell("NaN"), Value::from("NaN"));
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let err = read_csv_from_reader("a,b\n1,2\n3\n".as_bytes(), Path::new("ragged.csv"))
            .unwrap_err();
        assert!(matches!(err, IngestError::CsvParse { .. }));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = read_csv_from_reader("a,a\n1,2\n".as_bytes(), Path::new("dup.csv")).unwrap_err();
        assert!(matches!(err, IngestError::DuplicateColumn { column, .. } if column == "a"));
    }
}
