//! Per-column descriptive statistics.

use tabrule_model::{Dataset, Row, Value};
use tabrule_transform::stats;

const BASE_FIELDS: [&str; 11] = [
    "column",
    "mean",
    "median",
    "std",
    "min",
    "max",
    "count",
    "missing_count",
    "missing_percentage",
    "q25",
    "q75",
];

const FINANCIAL_FIELDS: [&str; 6] = [
    "total",
    "positive_sum",
    "negative_sum",
    "positive_count",
    "negative_count",
    "zero_count",
];

/// One output row per column, led by the column name.
pub(crate) fn summary_stats(dataset: &Dataset, columns: &[String], financial: bool) -> Dataset {
    let mut fields: Vec<String> = BASE_FIELDS.iter().map(ToString::to_string).collect();
    if financial {
        fields.extend(FINANCIAL_FIELDS.iter().map(ToString::to_string));
    }

    let total = dataset.height();
    let rows = columns
        .iter()
        .map(|column| {
            let numbers: Vec<f64> = dataset.values(column).filter_map(Value::as_f64).collect();
            let missing = dataset.values(column).filter(|v| v.is_null()).count();
            let missing_percentage = if total == 0 {
                0.0
            } else {
                (missing as f64 / total as f64 * 10_000.0).round() / 100.0
            };
            let mut row = Row::new();
            row.insert("column".to_string(), Value::from(column.as_str()));
            let mut put = |name: &str, value: Value| {
                row.insert(name.to_string(), value);
            };
            put("mean", stats::mean(&numbers).into());
            put("median", stats::median(&numbers).into());
            put("std", stats::std_dev(&numbers).into());
            put("min", stats::min(&numbers).into());
            put("max", stats::max(&numbers).into());
            put("count", Value::from(numbers.len()));
            put("missing_count", Value::from(missing));
            put("missing_percentage", Value::from(missing_percentage));
            put("q25", stats::quantile(&numbers, 0.25).into());
            put("q75", stats::quantile(&numbers, 0.75).into());
            if financial {
                let positive: Vec<f64> = numbers.iter().copied().filter(|v| *v > 0.0).collect();
                let negative: Vec<f64> = numbers.iter().copied().filter(|v| *v < 0.0).collect();
                put("total", Value::from(stats::sum(&numbers)));
                put("positive_sum", Value::from(stats::sum(&positive)));
                put("negative_sum", Value::from(stats::sum(&negative)));
                put("positive_count", Value::from(positive.len()));
                put("negative_count", Value::from(negative.len()));
                put(
                    "zero_count",
                    Value::from(numbers.iter().filter(|v| **v == 0.0).count()),
                );
            }
            row
        })
        .collect();

    Dataset {
        columns: fields,
        rows,
        schema: None,
    }
}
