//! Missing-value and outlier policies applied before aggregation.

use serde::{Deserialize, Serialize};

/// How nulls in monitored columns are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Remove rows with a null in any monitored column.
    Drop,
    /// Replace nulls with the column mean (numeric columns only).
    FillMean,
    /// Replace nulls with the most frequent value, first-seen on ties.
    FillMode,
}

/// How IQR outliers in monitored numeric columns are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierPolicy {
    #[default]
    Keep,
    Remove,
}

/// Cleaning rules embedded in an aggregation config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningRules {
    /// `None` leaves nulls untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<MissingValuePolicy>,
    #[serde(default)]
    pub outliers: OutlierPolicy,
    /// Columns rewritten to `YYYY-MM-DD` before aggregation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_columns: Vec<String>,
}

impl CleaningRules {
    /// True when no cleaning would be performed.
    pub fn is_noop(&self) -> bool {
        self.missing_values.is_none()
            && self.outliers == OutlierPolicy::Keep
            && self.date_columns.is_empty()
    }

    pub fn with_missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = Some(policy);
        self
    }

    pub fn with_outliers(mut self, policy: OutlierPolicy) -> Self {
        self.outliers = policy;
        self
    }
}
