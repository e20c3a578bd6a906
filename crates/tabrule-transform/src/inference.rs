//! Schema inference from sampled cell values.
//!
//! Each column is classified from its first `sample_size` non-null values:
//!
//! 1. **numeric** if at least `match_threshold` of the sample is a number
//! 2. **datetime** if at least `match_threshold` parses as a date
//! 3. **categorical** if the distinct count is at most
//!    `min(categorical_max_distinct, categorical_max_ratio * rows)`
//! 4. **text** otherwise
//!
//! Inference is a pure function of the dataset and the settings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tabrule_model::{
    ColumnSchema, ColumnType, DataQuality, Dataset, DatasetSchema, EngineError, Result,
    SampleStats, SparseColumn, Value, ValueKey,
};
use tracing::debug;

use crate::normalization::{DateOrder, parse_date};
use crate::stats;

/// Null share above which a column is reported as sparse.
pub const SPARSE_NULL_RATIO: f64 = 0.5;

/// Number of example values kept in [`SampleStats::sample_values`].
const EXAMPLE_VALUES: usize = 5;

/// Tunables for [`infer_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSettings {
    pub sample_size: usize,
    pub match_threshold: f64,
    pub categorical_max_distinct: usize,
    pub categorical_max_ratio: f64,
    #[serde(skip)]
    pub date_order: DateOrder,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            match_threshold: 0.9,
            categorical_max_distinct: 20,
            categorical_max_ratio: 0.05,
            date_order: DateOrder::DayFirst,
        }
    }
}

/// Infer the schema of every column in `dataset`.
///
/// Fails with a schema error only when the dataset has no columns.
pub fn infer_schema(dataset: &Dataset, settings: &InferenceSettings) -> Result<DatasetSchema> {
    if dataset.columns.is_empty() {
        return Err(EngineError::Schema("dataset has no columns".to_string()));
    }
    let columns: Vec<ColumnSchema> = dataset
        .columns
        .iter()
        .map(|name| infer_column(dataset, name, settings))
        .collect();
    let quality = data_quality(dataset, &columns);
    debug!(
        columns = columns.len(),
        rows = dataset.height(),
        duplicate_rows = quality.duplicate_rows,
        "inferred schema"
    );
    Ok(DatasetSchema { columns, quality })
}

fn infer_column(dataset: &Dataset, name: &str, settings: &InferenceSettings) -> ColumnSchema {
    let total_rows = dataset.height();
    let null_count = dataset.values(name).filter(|v| v.is_null()).count();
    let distinct_count = stats::distinct_count(dataset.values(name));
    let sample: Vec<&Value> = dataset
        .values(name)
        .filter(|v| !v.is_null())
        .take(settings.sample_size)
        .collect();

    let inferred_type = classify(&sample, distinct_count, total_rows, settings);
    let mut sample_stats = SampleStats {
        sampled: sample.len(),
        null_count,
        distinct_count,
        sample_values: sample.iter().take(EXAMPLE_VALUES).map(|v| (*v).clone()).collect(),
        ..SampleStats::default()
    };
    if inferred_type == ColumnType::Numeric {
        let numbers: Vec<f64> = sample.iter().filter_map(|v| v.as_f64()).collect();
        sample_stats.min = stats::min(&numbers);
        sample_stats.max = stats::max(&numbers);
        sample_stats.mean = stats::mean(&numbers);
    }
    ColumnSchema {
        name: name.to_string(),
        inferred_type,
        nullable: null_count > 0,
        sample_stats,
    }
}

fn classify(
    sample: &[&Value],
    distinct_count: usize,
    total_rows: usize,
    settings: &InferenceSettings,
) -> ColumnType {
    if sample.is_empty() {
        return ColumnType::Text;
    }
    let ratio = |matches: usize| matches as f64 / sample.len() as f64;

    let numeric = sample.iter().filter(|v| is_number(v)).count();
    if ratio(numeric) >= settings.match_threshold {
        return ColumnType::Numeric;
    }
    let dates = sample
        .iter()
        .filter(|v| {
            v.as_str()
                .is_some_and(|text| parse_date(text, settings.date_order).is_some())
        })
        .count();
    if ratio(dates) >= settings.match_threshold {
        return ColumnType::Datetime;
    }
    let cap = (settings.categorical_max_distinct as f64)
        .min(settings.categorical_max_ratio * total_rows as f64);
    if distinct_count as f64 <= cap {
        return ColumnType::Categorical;
    }
    ColumnType::Text
}

fn is_number(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_finite(),
        Value::Text(_) => value.as_f64().is_some(),
        _ => false,
    }
}

fn data_quality(dataset: &Dataset, columns: &[ColumnSchema]) -> DataQuality {
    let rows = dataset.height();
    let sparse_columns = if rows == 0 {
        Vec::new()
    } else {
        columns
            .iter()
            .filter_map(|column| {
                let share = column.sample_stats.null_count as f64 / rows as f64;
                (share > SPARSE_NULL_RATIO).then(|| SparseColumn {
                    column: column.name.clone(),
                    null_percentage: (share * 10_000.0).round() / 100.0,
                })
            })
            .collect()
    };

    let mut seen: HashSet<Vec<ValueKey>> = HashSet::with_capacity(rows);
    let duplicate_rows = dataset
        .rows
        .iter()
        .filter(|row| {
            let key: Vec<ValueKey> = dataset
                .columns
                .iter()
                .map(|column| Dataset::cell(row, column).key())
                .collect();
            !seen.insert(key)
        })
        .count();

    DataQuality {
        sparse_columns,
        duplicate_rows,
    }
}
