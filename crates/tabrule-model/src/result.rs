//! Execution outputs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Row};

/// Non-fatal, value-level problem recorded during an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Rule or step that produced the warning.
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
    pub count: usize,
}

impl Warning {
    pub fn new(rule: impl Into<String>, message: impl Into<String>, count: usize) -> Self {
        Self {
            rule: rule.into(),
            column: None,
            message: message.into(),
            count,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "{} [{}]: {} ({} values)",
                self.rule, column, self.message, self.count
            ),
            None => write!(f, "{}: {} ({})", self.rule, self.message, self.count),
        }
    }
}

/// Output of one apply operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    /// Assemble a result from a final table and the rendered warnings.
    pub fn from_table(columns: Vec<String>, rows: Vec<Row>, warnings: Vec<String>) -> Self {
        Self {
            total_rows: rows.len(),
            total_columns: columns.len(),
            columns,
            rows,
            warnings,
        }
    }

    /// Result that carries a dataset through unchanged.
    pub fn from_dataset(dataset: Dataset, warnings: Vec<String>) -> Self {
        Self::from_table(dataset.columns, dataset.rows, warnings)
    }
}
