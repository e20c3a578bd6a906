//! Column-level value normalization.
//!
//! - **datetime**: date parsing and ISO 8601 output
//! - **numeric**: currency stripping
//! - **mapping**: CR/DR, account and lookup-table mapping
//!
//! Normalization is fail-soft: a value that cannot be transformed becomes
//! null, the row is kept, and the failure is counted in a [`Warning`].

pub mod datetime;
pub mod mapping;
pub mod numeric;

pub use datetime::{DateOrder, format_iso8601_date, parse_date, to_iso8601};
pub use mapping::{account_standardize, cr_dr};
pub use numeric::strip_currency;

use tabrule_model::{
    ColumnType, Dataset, NormalizationConfig, Result, TransformKind, Value, Warning,
};
use tracing::{debug, warn};

/// Outcome of transforming one cell.
enum Transformed {
    /// New value for the cell.
    Value(Value),
    /// Value left untouched and counted (unmapped lookup).
    Unmapped,
    /// Value could not be transformed; the cell becomes null.
    Failed,
}

/// Applies normalization rules to a dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizationEngine {
    date_order: DateOrder,
}

impl NormalizationEngine {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    /// Apply one normalization rule in place.
    ///
    /// Every referenced column must exist; otherwise nothing is modified and
    /// a validation error is returned. The schema, when present, is updated
    /// for columns whose type the transform fixes (dates, amounts). Renames
    /// run last, so transforms are keyed by the original names.
    pub fn apply(
        &self,
        dataset: &mut Dataset,
        rule_name: &str,
        config: &NormalizationConfig,
    ) -> Result<Vec<Warning>> {
        let raw = serde_json::to_value(config).unwrap_or_default();
        dataset.require_columns(
            config.columns.keys().chain(config.rename.keys()).map(String::as_str),
            &raw,
        )?;
        dataset.check_renames(&config.rename, &raw)?;

        let mut warnings = Vec::new();
        for (column, transform) in &config.columns {
            let mut failed = 0usize;
            let mut unmapped = 0usize;
            for row in &mut dataset.rows {
                let Some(cell) = row.get_mut(column) else {
                    continue;
                };
                if cell.is_null() {
                    *cell = Value::Null;
                    continue;
                }
                match self.transform(transform, cell) {
                    Transformed::Value(value) => *cell = value,
                    Transformed::Unmapped => unmapped += 1,
                    Transformed::Failed => {
                        *cell = Value::Null;
                        failed += 1;
                    }
                }
            }
            debug!(
                rule = rule_name,
                column = column.as_str(),
                transform = transform.as_str(),
                failed,
                unmapped,
                "normalized column"
            );
            if failed > 0 {
                warn!(
                    rule = rule_name,
                    column = column.as_str(),
                    failed,
                    "values could not be normalized"
                );
                warnings.push(
                    Warning::new(
                        rule_name,
                        format!("{} could not transform value", transform.as_str()),
                        failed,
                    )
                    .with_column(column.as_str()),
                );
            }
            if unmapped > 0 {
                warnings.push(
                    Warning::new(rule_name, "no mapping for value", unmapped)
                        .with_column(column.as_str()),
                );
            }
            if let Some(column_type) = fixed_type(transform) {
                if let Some(schema) = dataset.schema.as_mut() {
                    if let Some(entry) = schema.columns.iter_mut().find(|c| &c.name == column) {
                        entry.inferred_type = column_type;
                    }
                }
            }
        }
        if !config.rename.is_empty() {
            dataset.rename_columns(&config.rename, &raw)?;
            debug!(rule = rule_name, renamed = config.rename.len(), "renamed columns");
        }
        Ok(warnings)
    }

    fn transform(&self, transform: &TransformKind, value: &Value) -> Transformed {
        match transform {
            TransformKind::DateIso8601 => match to_iso8601(&value.render(), self.date_order) {
                Some(date) => Transformed::Value(Value::Text(date)),
                None => Transformed::Failed,
            },
            TransformKind::StripCurrency => match value {
                Value::Number(n) => Transformed::Value(Value::Number(*n)),
                Value::Text(text) => strip_currency(text)
                    .map_or(Transformed::Failed, |n| Transformed::Value(Value::Number(n))),
                _ => Transformed::Failed,
            },
            TransformKind::CrDrMapping => match value.as_str().and_then(cr_dr) {
                Some(mapped) => Transformed::Value(Value::from(mapped)),
                None => Transformed::Value(value.clone()),
            },
            TransformKind::AccountStandardize => account_standardize(&value.render())
                .map_or(Transformed::Failed, |s| Transformed::Value(Value::Text(s))),
            TransformKind::CustomMapping { mapping: table } => {
                match mapping::lookup(table, &value.render()) {
                    Some(mapped) => Transformed::Value(Value::from(mapped)),
                    None => Transformed::Unmapped,
                }
            }
        }
    }
}

/// Column type guaranteed after a transform succeeds.
fn fixed_type(transform: &TransformKind) -> Option<ColumnType> {
    match transform {
        TransformKind::DateIso8601 => Some(ColumnType::Datetime),
        TransformKind::StripCurrency => Some(ColumnType::Numeric),
        _ => None,
    }
}
