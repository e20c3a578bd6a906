//! Row flagging with predicate rules.
//!
//! Operators form a closed set ([`FlagOperator`]) and are evaluated by a
//! single function. Matching rows get `flagged = true` and the rule reason
//! appended to `flag_reason`. Outlier rules are fitted to the column before
//! rows are tested.

use regex::Regex;
use tabrule_model::{
    Dataset, EngineError, FlagConfig, FlagOperator, OutlierMethod, Result, Value,
};
use tracing::debug;

use crate::stats::{self, IqrBounds};

/// Z-score beyond which a value is an outlier.
pub const ZSCORE_CUTOFF: f64 = 3.0;

pub const FLAGGED_COLUMN: &str = "flagged";
pub const FLAG_REASON_COLUMN: &str = "flag_reason";

/// Separator between reasons of several matching rules.
pub const REASON_SEPARATOR: &str = "; ";

/// A flag rule with its threshold decoded for evaluation.
#[derive(Debug, Clone)]
pub struct FlagPredicate {
    column: String,
    reason: String,
    test: Test,
}

#[derive(Debug, Clone)]
enum Test {
    Compare(FlagOperator, f64),
    Equals(Value),
    Contains(String),
    Matches(Regex),
    /// Unfitted outlier rule; matches nothing until [`FlagPredicate::fit`].
    Outlier(OutlierMethod),
    Outside { lower: f64, upper: f64 },
}

impl FlagPredicate {
    /// Compile a config. Invalid regexes and thresholds are validation errors.
    pub fn compile(config: &FlagConfig) -> Result<Self> {
        config.validate()?;
        let invalid = |message: String| EngineError::validation(message, config);
        let test = match config.operator {
            FlagOperator::Gt | FlagOperator::Gte | FlagOperator::Lt | FlagOperator::Lte => {
                let threshold = config
                    .threshold
                    .as_f64()
                    .ok_or_else(|| invalid("numeric threshold required".to_string()))?;
                Test::Compare(config.operator, threshold)
            }
            FlagOperator::Eq => Test::Equals(config.threshold.clone()),
            FlagOperator::Contains => Test::Contains(config.threshold.render()),
            FlagOperator::Regex => {
                let pattern = config.threshold.render();
                let regex = Regex::new(&pattern)
                    .map_err(|e| invalid(format!("invalid regex '{pattern}': {e}")))?;
                Test::Matches(regex)
            }
            FlagOperator::Outlier => Test::Outlier(config.outlier_method()?),
        };
        Ok(Self {
            column: config.column.clone(),
            reason: config.reason.clone(),
            test,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Resolve an outlier rule against the numeric values of its column.
    ///
    /// A column with too few values, or a zero standard deviation under
    /// z-score, yields no outliers. Other predicates are returned as is.
    pub fn fit(mut self, dataset: &Dataset) -> Self {
        let Test::Outlier(method) = self.test else {
            return self;
        };
        let values: Vec<f64> = dataset
            .values(&self.column)
            .filter_map(Value::as_f64)
            .collect();
        let fences = match method {
            OutlierMethod::Iqr => IqrBounds::from_values(&values).map(|b| (b.lower, b.upper)),
            OutlierMethod::Zscore => stats::mean(&values)
                .zip(stats::std_dev(&values))
                .filter(|(_, std)| *std > 0.0)
                .map(|(mean, std)| (mean - ZSCORE_CUTOFF * std, mean + ZSCORE_CUTOFF * std)),
        };
        self.test = match fences {
            Some((lower, upper)) => Test::Outside { lower, upper },
            None => Test::Outside {
                lower: f64::NEG_INFINITY,
                upper: f64::INFINITY,
            },
        };
        self
    }

    /// Evaluate against one cell. Nulls never match.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match &self.test {
            Test::Compare(operator, threshold) => value.as_f64().is_some_and(|v| match operator {
                FlagOperator::Gt => v > *threshold,
                FlagOperator::Gte => v >= *threshold,
                FlagOperator::Lt => v < *threshold,
                FlagOperator::Lte => v <= *threshold,
                _ => false,
            }),
            Test::Equals(expected) => match (value.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => value.render() == expected.render(),
            },
            Test::Contains(needle) => value.render().contains(needle.as_str()),
            Test::Matches(regex) => regex.is_match(&value.render()),
            Test::Outlier(_) => false,
            Test::Outside { lower, upper } => value
                .as_f64()
                .is_some_and(|v| v < *lower || v > *upper),
        }
    }
}

/// Apply one flag rule in place, returning the number of matching rows.
///
/// The flag columns are added on first use; non-matching rows read
/// `flagged = false` with a null reason.
pub fn apply_flag(dataset: &mut Dataset, rule_name: &str, config: &FlagConfig) -> Result<usize> {
    let raw = serde_json::to_value(config).unwrap_or_default();
    dataset.require_columns([config.column.as_str()], &raw)?;
    let predicate = FlagPredicate::compile(config)?.fit(dataset);

    dataset.ensure_column(FLAGGED_COLUMN);
    dataset.ensure_column(FLAG_REASON_COLUMN);
    let mut matched = 0usize;
    for row in &mut dataset.rows {
        let hit = predicate.matches(Dataset::cell(row, predicate.column()));
        let flagged = row
            .entry(FLAGGED_COLUMN.to_string())
            .or_insert(Value::Bool(false));
        if !hit {
            continue;
        }
        *flagged = Value::Bool(true);
        matched += 1;
        let reason = row.entry(FLAG_REASON_COLUMN.to_string()).or_default();
        *reason = match reason.as_str().filter(|r| !r.is_empty()) {
            Some(existing) => Value::Text(format!("{existing}{REASON_SEPARATOR}{}", predicate.reason)),
            None => Value::Text(predicate.reason.clone()),
        };
    }
    for row in &mut dataset.rows {
        row.entry(FLAG_REASON_COLUMN.to_string()).or_default();
    }
    debug!(rule = rule_name, matched, rows = dataset.height(), "applied flag rule");
    Ok(matched)
}
