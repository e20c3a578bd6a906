//! Column references of aggregation configs and their type checks.

use tabrule_model::{AggFn, AggregationConfig, Dataset, EngineError, Result};

use crate::pattern::pattern_group_by;

/// Columns an aggregation reads, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedColumns {
    /// Partition and date columns.
    pub keys: Vec<String>,
    /// Columns fed to aggregation functions, with the functions applied.
    pub values: Vec<(String, Vec<AggFn>)>,
}

impl ReferencedColumns {
    /// Union of key and value columns in first-reference order.
    ///
    /// These are the columns cleaning policies monitor.
    pub fn monitored(&self) -> Vec<String> {
        let mut monitored: Vec<String> = Vec::new();
        let names = self
            .keys
            .iter()
            .chain(self.values.iter().map(|(column, _)| column));
        for name in names {
            if !monitored.contains(name) {
                monitored.push(name.clone());
            }
        }
        monitored
    }
}

/// Resolve the columns `config` reads from `dataset`.
///
/// Summary statistics without explicit columns read every numeric column.
pub fn referenced_columns(config: &AggregationConfig, dataset: &Dataset) -> ReferencedColumns {
    let owned = |columns: &[String]| columns.to_vec();
    match config {
        AggregationConfig::GroupBy(c) => ReferencedColumns {
            keys: owned(&c.group_by),
            values: resolved(c),
        },
        AggregationConfig::Pattern(c) => {
            let group_by = pattern_group_by(c.name, &c.cleaning_rules);
            ReferencedColumns {
                keys: owned(&group_by.group_by),
                values: resolved(&group_by),
            }
        }
        AggregationConfig::TimeSeries(c) => ReferencedColumns {
            keys: vec![c.date_column.clone()],
            values: std::iter::once(&c.value_column)
                .chain(&c.additional_columns)
                .map(|column| (column.clone(), vec![c.agg_fn]))
                .collect(),
        },
        AggregationConfig::Pivot(c) => ReferencedColumns {
            keys: c.index.iter().chain(&c.columns).cloned().collect(),
            values: c
                .values
                .iter()
                .map(|column| (column.clone(), vec![c.agg_fn]))
                .collect(),
        },
        AggregationConfig::SummaryStats(c) => {
            let columns = if c.columns.is_empty() {
                numeric_columns(dataset)
            } else {
                c.columns.clone()
            };
            ReferencedColumns {
                keys: Vec::new(),
                values: columns
                    .into_iter()
                    .map(|column| (column, vec![AggFn::Mean]))
                    .collect(),
            }
        }
    }
}

fn resolved(config: &tabrule_model::GroupByConfig) -> Vec<(String, Vec<AggFn>)> {
    config
        .resolved_aggregations()
        .into_iter()
        .map(|(column, functions)| (column.to_string(), functions))
        .collect()
}

/// Numeric columns in schema order, or in column order without a schema.
pub fn numeric_columns(dataset: &Dataset) -> Vec<String> {
    match &dataset.schema {
        Some(schema) => schema
            .numeric_columns()
            .into_iter()
            .filter(|column| dataset.has_column(column))
            .map(ToString::to_string)
            .collect(),
        None => dataset
            .columns
            .iter()
            .filter(|column| {
                dataset.values(column).any(|v| !v.is_null()) && dataset.is_numeric(column)
            })
            .cloned()
            .collect(),
    }
}

/// Reject unknown columns and numeric functions on non-numeric columns.
///
/// Runs before any aggregation work; the error echoes the config.
pub fn validate_references(
    config: &AggregationConfig,
    dataset: &Dataset,
    referenced: &ReferencedColumns,
) -> Result<()> {
    let raw = serde_json::to_value(config).unwrap_or_default();
    dataset.require_columns(referenced.monitored().iter().map(String::as_str), &raw)?;
    for (column, functions) in &referenced.values {
        if dataset.is_numeric(column) {
            continue;
        }
        if let Some(function) = functions.iter().find(|f| f.requires_numeric()) {
            return Err(EngineError::Validation {
                message: format!(
                    "unsupported function '{function}' for non-numeric column '{column}'"
                ),
                config: raw,
            });
        }
    }
    Ok(())
}
