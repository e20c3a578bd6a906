//! Missing-value and outlier cleaning applied ahead of aggregation.
//!
//! Cleaning only looks at the *monitored* columns: the columns the active
//! aggregation reads. Steps run in a fixed order: date standardization,
//! missing values, then outliers.

use tabrule_model::{
    CleaningRules, Dataset, EngineError, MissingValuePolicy, OutlierPolicy, Result,
    Value, Warning,
};
use tracing::debug;

use crate::normalization::{DateOrder, to_iso8601};
use crate::stats::{self, IqrBounds};

/// What a cleaning pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Rows removed by the `drop` policy.
    pub dropped_missing: usize,
    /// Cells filled by `fill_mean` or `fill_mode`.
    pub filled: usize,
    /// Rows removed as IQR outliers.
    pub removed_outliers: usize,
    pub warnings: Vec<Warning>,
}

/// Applies [`CleaningRules`] to a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningPipeline {
    date_order: DateOrder,
}

impl CleaningPipeline {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    /// Clean `dataset` in place.
    ///
    /// Column references and `fill_mean` types are checked before any row
    /// is touched, so an error leaves the dataset unchanged.
    pub fn apply(
        &self,
        dataset: &mut Dataset,
        rules: &CleaningRules,
        monitored: &[String],
    ) -> Result<CleaningReport> {
        let raw = serde_json::to_value(rules).unwrap_or_default();
        dataset.require_columns(
            monitored
                .iter()
                .chain(&rules.date_columns)
                .map(String::as_str),
            &raw,
        )?;
        if rules.missing_values == Some(MissingValuePolicy::FillMean) {
            check_fill_mean(dataset, monitored)?;
        }

        let mut report = CleaningReport {
            rows_before: dataset.height(),
            ..CleaningReport::default()
        };
        for column in &rules.date_columns {
            self.standardize_dates(dataset, column, &mut report);
        }
        match rules.missing_values {
            Some(MissingValuePolicy::Drop) => {
                let before = dataset.height();
                dataset.rows.retain(|row| {
                    monitored
                        .iter()
                        .all(|column| !Dataset::cell(row, column).is_null())
                });
                report.dropped_missing = before - dataset.height();
            }
            Some(MissingValuePolicy::FillMean) => {
                for column in monitored {
                    let numbers: Vec<f64> = dataset.values(column).filter_map(Value::as_f64).collect();
                    if let Some(mean) = stats::mean(&numbers) {
                        report.filled += fill_nulls(dataset, column, &Value::Number(mean));
                    }
                }
            }
            Some(MissingValuePolicy::FillMode) => {
                for column in monitored {
                    if let Some(mode) = stats::mode(dataset.values(column)) {
                        report.filled += fill_nulls(dataset, column, &mode);
                    }
                }
            }
            None => {}
        }
        if rules.outliers == OutlierPolicy::Remove {
            report.removed_outliers = remove_outliers(dataset, monitored);
        }
        report.rows_after = dataset.height();
        debug!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            dropped_missing = report.dropped_missing,
            filled = report.filled,
            removed_outliers = report.removed_outliers,
            "cleaned dataset"
        );
        Ok(report)
    }

    fn standardize_dates(&self, dataset: &mut Dataset, column: &str, report: &mut CleaningReport) {
        let mut failed = 0usize;
        for row in &mut dataset.rows {
            let Some(cell) = row.get_mut(column) else {
                continue;
            };
            if cell.is_null() {
                continue;
            }
            *cell = match to_iso8601(&cell.render(), self.date_order) {
                Some(date) => Value::Text(date),
                None => {
                    failed += 1;
                    Value::Null
                }
            };
        }
        if failed > 0 {
            report.warnings.push(
                Warning::new("cleaning", "unparseable date set to null", failed).with_column(column),
            );
        }
    }
}

/// `fill_mean` is only defined for numeric columns, whether or not the
/// column has anything to fill.
fn check_fill_mean(dataset: &Dataset, monitored: &[String]) -> Result<()> {
    for column in monitored {
        if !dataset.is_numeric(column) {
            return Err(EngineError::Type(format!(
                "fill_mean requires a numeric column, '{column}' is {}",
                dataset
                    .column_type(column)
                    .map_or("not numeric", |t| t.as_str())
            )));
        }
    }
    Ok(())
}

fn fill_nulls(dataset: &mut Dataset, column: &str, fill: &Value) -> usize {
    let mut filled = 0;
    for row in &mut dataset.rows {
        let cell = row.entry(column.to_string()).or_default();
        if cell.is_null() {
            *cell = fill.clone();
            filled += 1;
        }
    }
    filled
}

/// Drop rows holding an outlier in any monitored numeric column.
///
/// Fences for every column are computed on the same input before any row
/// is removed.
fn remove_outliers(dataset: &mut Dataset, monitored: &[String]) -> usize {
    let fences: Vec<(&String, IqrBounds)> = monitored
        .iter()
        .filter(|column| dataset.is_numeric(column))
        .filter_map(|column| {
            let numbers: Vec<f64> = dataset.values(column).filter_map(Value::as_f64).collect();
            IqrBounds::from_values(&numbers).map(|bounds| (column, bounds))
        })
        .collect();
    if fences.is_empty() {
        return 0;
    }
    let before = dataset.height();
    dataset.rows.retain(|row| {
        fences.iter().all(|(column, bounds)| {
            Dataset::cell(row, column)
                .as_f64()
                .is_none_or(|value| !bounds.is_outlier(value))
        })
    });
    before - dataset.height()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(values: &[f64]) -> Dataset {
        Dataset::from_records(
            &["Amount"],
            values.iter().map(|v| vec![Value::from(*v)]).collect(),
        )
    }

    fn monitored(columns: &[&str]) -> Vec<String> {
        columns.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn iqr_removes_extreme_value() {
        let mut ds = amounts(&[10.0, 12.0, 11.0, 13.0, 1000.0]);
        let rules = CleaningRules::default().with_outliers(OutlierPolicy::Remove);
        let report = CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Amount"]))
            .unwrap();
        assert_eq!(report.removed_outliers, 1);
        let kept: Vec<f64> = ds.values("Amount").filter_map(Value::as_f64).collect();
        assert_eq!(kept, vec![10.0, 12.0, 11.0, 13.0]);
    }

    #[test]
    fn keep_leaves_outliers() {
        let mut ds = amounts(&[10.0, 12.0, 11.0, 13.0, 1000.0]);
        let report = CleaningPipeline::default()
            .apply(&mut ds, &CleaningRules::default(), &monitored(&["Amount"]))
            .unwrap();
        assert_eq!(report.rows_after, 5);
    }

    #[test]
    fn drop_removes_rows_with_null_in_monitored_column() {
        let mut ds = Dataset::from_records(
            &["Account", "Amount", "Note"],
            vec![
                vec!["A1".into(), 5.0.into(), Value::Null],
                vec![Value::Null, 7.0.into(), "x".into()],
                vec!["A2".into(), Value::Null, "y".into()],
            ],
        );
        let rules = CleaningRules::default().with_missing_values(MissingValuePolicy::Drop);
        let report = CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Account", "Amount"]))
            .unwrap();
        assert_eq!(report.dropped_missing, 2);
        assert_eq!(ds.height(), 1);
    }

    #[test]
    fn fill_mean_uses_non_null_mean() {
        let mut ds = Dataset::from_records(
            &["Amount"],
            vec![vec![2.0.into()], vec![Value::Null], vec![4.0.into()]],
        );
        let rules = CleaningRules::default().with_missing_values(MissingValuePolicy::FillMean);
        let report = CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Amount"]))
            .unwrap();
        assert_eq!(report.filled, 1);
        assert_eq!(Dataset::cell(&ds.rows[1], "Amount"), &Value::from(3.0));
    }

    #[test]
    fn fill_mean_on_text_is_type_error() {
        let mut ds = Dataset::from_records(
            &["Region"],
            vec![vec!["north".into()], vec![Value::Null]],
        );
        let before = ds.clone();
        let rules = CleaningRules::default().with_missing_values(MissingValuePolicy::FillMean);
        let err = CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Region"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Type(_)));
        assert_eq!(ds, before);
    }

    #[test]
    fn fill_mean_rejects_text_without_nulls() {
        let mut ds = Dataset::from_records(
            &["Region", "Amount"],
            vec![
                vec!["north".into(), 1.0.into()],
                vec!["south".into(), Value::Null],
            ],
        );
        let before = ds.clone();
        let rules = CleaningRules::default().with_missing_values(MissingValuePolicy::FillMean);
        let err = CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Amount", "Region"]))
            .unwrap_err();
        assert!(err.to_string().contains("Region"), "{err}");
        assert_eq!(ds, before);
    }

    #[test]
    fn fill_mode_breaks_ties_by_first_seen() {
        let mut ds = Dataset::from_records(
            &["Region"],
            vec![
                vec!["south".into()],
                vec!["north".into()],
                vec![Value::Null],
                vec!["north".into()],
                vec!["south".into()],
            ],
        );
        let rules = CleaningRules::default().with_missing_values(MissingValuePolicy::FillMode);
        CleaningPipeline::default()
            .apply(&mut ds, &rules, &monitored(&["Region"]))
            .unwrap();
        assert_eq!(Dataset::cell(&ds.rows[2], "Region"), &Value::from("south"));
    }

    #[test]
    fn date_columns_are_standardized() {
        let mut ds = Dataset::from_records(
            &["Date"],
            vec![vec!["15/01/2024".into()], vec!["garbage".into()]],
        );
        let rules = CleaningRules {
            date_columns: vec!["Date".to_string()],
            ..CleaningRules::default()
        };
        let report = CleaningPipeline::default()
            .apply(&mut ds, &rules, &[])
            .unwrap();
        assert_eq!(Dataset::cell(&ds.rows[0], "Date"), &Value::from("2024-01-15"));
        assert_eq!(Dataset::cell(&ds.rows[1], "Date"), &Value::Null);
        assert_eq!(report.warnings[0].count, 1);
    }
}
