//! Calendar-bucketed time-series aggregation.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use tabrule_model::{Dataset, Frequency, Row, TimeSeriesConfig, Value, Warning};
use tabrule_transform::normalization::{DateOrder, format_iso8601_date, parse_date};

use crate::functions::{evaluate, output_name};

/// Start of the calendar period containing `date`.
///
/// Weeks start on Monday; quarters on January, April, July and October.
pub fn bucket_start(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    let first_of = |month: u32| NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date);
    match frequency {
        Frequency::Day => date,
        Frequency::Week => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(date),
        Frequency::Month => first_of(date.month()),
        Frequency::Quarter => first_of((date.month0() / 3) * 3 + 1),
        Frequency::Year => first_of(1),
    }
}

/// Aggregate `value_column` (and any additional columns) per bucket.
///
/// Buckets are ascending by start date; empty buckets are omitted. Rows
/// whose date does not parse are skipped and reported in one warning.
pub(crate) fn time_series(
    dataset: &Dataset,
    config: &TimeSeriesConfig,
    date_order: DateOrder,
) -> (Dataset, Vec<Warning>) {
    let mut buckets: BTreeMap<NaiveDate, Vec<&Row>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in &dataset.rows {
        let cell = Dataset::cell(row, &config.date_column);
        if cell.is_null() {
            skipped += 1;
            continue;
        }
        match parse_date(&cell.render(), date_order) {
            Some(date) => buckets
                .entry(bucket_start(date, config.frequency))
                .or_default()
                .push(row),
            None => skipped += 1,
        }
    }

    let mut value_columns: Vec<&String> = vec![&config.value_column];
    for column in &config.additional_columns {
        if !value_columns.contains(&column) {
            value_columns.push(column);
        }
    }
    let mut columns = vec![config.date_column.clone()];
    columns.extend(
        value_columns
            .iter()
            .map(|column| output_name(column, config.agg_fn)),
    );

    let rows = buckets
        .into_iter()
        .map(|(start, rows)| {
            let mut out = Row::new();
            out.insert(
                config.date_column.clone(),
                Value::Text(format_iso8601_date(start)),
            );
            for column in &value_columns {
                let cells: Vec<&Value> = rows.iter().map(|r| Dataset::cell(r, column)).collect();
                out.insert(
                    output_name(column, config.agg_fn),
                    evaluate(config.agg_fn, &cells),
                );
            }
            out
        })
        .collect();

    let mut warnings = Vec::new();
    if skipped > 0 {
        warnings.push(
            Warning::new("time_series", "row skipped for missing or unparseable date", skipped)
                .with_column(config.date_column.as_str()),
        );
    }
    let table = Dataset {
        columns,
        rows,
        schema: None,
    };
    (table, warnings)
}
