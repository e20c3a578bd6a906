//! Inferred column schema and per-column sample statistics.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Inferred logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Datetime,
    Categorical,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Categorical => "categorical",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic statistics computed over the inference sample of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Number of non-null values sampled.
    pub sampled: usize,
    /// Nulls across the whole column (not just the sample).
    pub null_count: usize,
    /// Distinct non-null values across the whole column.
    pub distinct_count: usize,
    /// Numeric summary, present only for numeric columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// First few non-null values, in row order.
    #[serde(default)]
    pub sample_values: Vec<Value>,
}

/// Schema entry for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub inferred_type: ColumnType,
    pub nullable: bool,
    pub sample_stats: SampleStats,
}

/// A column whose null share exceeds the sparse threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseColumn {
    pub column: String,
    pub null_percentage: f64,
}

/// Dataset-level quality indicators collected during inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Columns that are more than half empty.
    pub sparse_columns: Vec<SparseColumn>,
    /// Rows that exactly duplicate an earlier row.
    pub duplicate_rows: usize,
}

/// The full inferred schema of a dataset, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub quality: DataQuality,
}

impl DatasetSchema {
    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Inferred type of a column, if present.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|column| column.inferred_type)
    }

    /// Names of numeric columns in schema order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.inferred_type == ColumnType::Numeric)
            .map(|column| column.name.as_str())
            .collect()
    }

    /// Replace (or append) the entry for a column.
    pub fn upsert(&mut self, column: ColumnSchema) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }
}
