//! Bridge from Polars DataFrames to datasets.

use polars::prelude::{AnyValue, DataFrame};
use tabrule_model::{Dataset, Value};

use crate::error::Result;
use crate::reader::parse_cell;

/// Convert one Polars cell.
///
/// Integers and floats become numbers, booleans stay booleans, strings go
/// through the same parsing as CSV cells. Other types use their display
/// form.
pub fn any_to_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::Number(f64::from(v)),
        AnyValue::Int16(v) => Value::Number(f64::from(v)),
        AnyValue::Int32(v) => Value::Number(f64::from(v)),
        AnyValue::Int64(v) => Value::Number(v as f64),
        AnyValue::UInt8(v) => Value::Number(f64::from(v)),
        AnyValue::UInt16(v) => Value::Number(f64::from(v)),
        AnyValue::UInt32(v) => Value::Number(f64::from(v)),
        AnyValue::UInt64(v) => Value::Number(v as f64),
        AnyValue::Float32(v) => number(f64::from(v)),
        AnyValue::Float64(v) => number(v),
        AnyValue::String(s) => parse_cell(s),
        AnyValue::StringOwned(s) => parse_cell(s.as_str()),
        other => {
            let s = other.to_string();
            let unquoted = s
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(&s);
            parse_cell(unquoted)
        }
    }
}

fn number(v: f64) -> Value {
    if v.is_finite() {
        Value::Number(v)
    } else {
        Value::Null
    }
}

/// Copy a DataFrame into a row-oriented [`Dataset`], keeping column order.
pub fn dataset_from_frame(df: &DataFrame) -> Result<Dataset> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns = df.get_columns();
    let mut records = Vec::with_capacity(df.height());
    for index in 0..df.height() {
        let mut record = Vec::with_capacity(columns.len());
        for column in columns {
            record.push(any_to_value(column.get(index)?));
        }
        records.push(record);
    }
    Ok(Dataset::from_records(&names, records))
}
