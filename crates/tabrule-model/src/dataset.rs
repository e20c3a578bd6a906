//! Row-oriented dataset representation.
//!
//! A [`Dataset`] is an ordered list of rows, each a mapping from column name
//! to [`Value`], plus the declared column order and (once inferred) the
//! [`DatasetSchema`]. Row order matters only for first-seen tie-breaks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::schema::{ColumnType, DatasetSchema};
use crate::value::Value;

/// A single row keyed by column name.
pub type Row = BTreeMap<String, Value>;

static NULL: Value = Value::Null;

/// Tabular data handed to the engine by the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column names in display order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Inferred schema; `None` until the schema step has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DatasetSchema>,
}

impl Dataset {
    /// Create an empty dataset with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            schema: None,
        }
    }

    /// Build a dataset from positional records.
    ///
    /// Records shorter than the header are padded with nulls; extra cells
    /// are ignored.
    pub fn from_records<S: AsRef<str>>(columns: &[S], records: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut cells = record.into_iter();
                columns
                    .iter()
                    .map(|name| (name.clone(), cells.next().unwrap_or(Value::Null)))
                    .collect::<Row>()
            })
            .collect();
        Self {
            columns,
            rows,
            schema: None,
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Value of `column` in `row`, `Null` when the cell is absent.
    pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
        row.get(column).unwrap_or(&NULL)
    }

    /// Iterate the values of one column in row order.
    pub fn values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| Self::cell(row, column))
    }

    /// Inferred type of a column, if the schema is known.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.schema.as_ref().and_then(|schema| schema.column_type(name))
    }

    /// Whether a column holds numbers: by schema once inferred, otherwise
    /// every non-null value must parse as a number.
    pub fn is_numeric(&self, column: &str) -> bool {
        match self.column_type(column) {
            Some(column_type) => column_type == ColumnType::Numeric,
            None => self
                .values(column)
                .filter(|v| !v.is_null())
                .all(|v| v.as_f64().is_some()),
        }
    }

    /// Append a column name if it is not already present.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Check that `renames` can be applied: every source exists and no
    /// target collides with a column that keeps its name or another target.
    pub fn check_renames(
        &self,
        renames: &BTreeMap<String, String>,
        config: &serde_json::Value,
    ) -> Result<()> {
        self.require_columns(renames.keys().map(String::as_str), config)?;
        let mut targets: Vec<&str> = self
            .columns
            .iter()
            .filter(|column| !renames.contains_key(*column))
            .map(String::as_str)
            .collect();
        for target in renames.values() {
            if targets.contains(&target.as_str()) {
                return Err(EngineError::Validation {
                    message: format!("rename target '{target}' already exists"),
                    config: config.clone(),
                });
            }
            targets.push(target);
        }
        Ok(())
    }

    /// Rename columns in place, keeping their position, row values and
    /// schema entries. Nothing changes when [`check_renames`](Self::check_renames)
    /// fails.
    pub fn rename_columns(
        &mut self,
        renames: &BTreeMap<String, String>,
        config: &serde_json::Value,
    ) -> Result<()> {
        self.check_renames(renames, config)?;
        let renamed = |name: &mut String| {
            if let Some(target) = renames.get(name.as_str()) {
                *name = target.clone();
            }
        };
        self.columns.iter_mut().for_each(renamed);
        for row in &mut self.rows {
            let moved: Vec<(String, Value)> = renames
                .iter()
                .filter_map(|(from, to)| row.remove(from).map(|value| (to.clone(), value)))
                .collect();
            row.extend(moved);
        }
        if let Some(schema) = self.schema.as_mut() {
            schema.columns.iter_mut().for_each(|c| renamed(&mut c.name));
            schema
                .quality
                .sparse_columns
                .iter_mut()
                .for_each(|s| renamed(&mut s.column));
        }
        Ok(())
    }

    /// Fail with a validation error naming every referenced column that is
    /// not in the dataset.
    pub fn require_columns<'a, I>(&self, columns: I, config: &serde_json::Value) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing: Vec<&str> = columns
            .into_iter()
            .filter(|column| !self.has_column(column))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(EngineError::Validation {
            message: format!("unknown column reference: {}", missing.join(", ")),
            config: config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    #[test]
    fn rename_keeps_position_and_values() {
        let mut ds = Dataset::from_records(
            &["Acct", "Amt", "Ref"],
            vec![vec!["A1".into(), 5.0.into(), "x".into()]],
        );
        ds.rename_columns(
            &renames(&[("Acct", "Amt"), ("Amt", "Amount")]),
            &serde_json::Value::Null,
        )
        .unwrap();
        assert_eq!(ds.columns, vec!["Amt", "Amount", "Ref"]);
        assert_eq!(Dataset::cell(&ds.rows[0], "Amt"), &Value::from("A1"));
        assert_eq!(Dataset::cell(&ds.rows[0], "Amount"), &Value::from(5.0));
    }

    #[test]
    fn rename_onto_existing_column_is_rejected() {
        let mut ds = Dataset::from_records(&["a", "b"], vec![vec![1.0.into(), 2.0.into()]]);
        let before = ds.clone();
        let err = ds
            .rename_columns(&renames(&[("a", "b")]), &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(
            ds.rename_columns(&renames(&[("missing", "c")]), &serde_json::Value::Null)
                .is_err()
        );
        assert_eq!(ds, before);
    }

    #[test]
    fn from_records_pads_short_rows() {
        let ds = Dataset::from_records(&["a", "b"], vec![vec![Value::from(1.0)]]);
        assert_eq!(ds.height(), 1);
        assert_eq!(Dataset::cell(&ds.rows[0], "b"), &Value::Null);
    }

    #[test]
    fn require_columns_lists_missing() {
        let ds = Dataset::new(vec!["a".to_string()]);
        let err = ds
            .require_columns(["a", "x", "y"], &serde_json::Value::Null)
            .unwrap_err();
        assert!(err.to_string().contains("x, y"));
    }
}
