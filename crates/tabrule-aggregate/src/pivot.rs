//! Cross-tabulation.

use std::collections::HashMap;

use tabrule_model::{Dataset, EngineError, PivotConfig, Result, Row, Value, ValueKey};

use crate::functions::evaluate;
use crate::group_by::partition;

/// Pivot `values` by the distinct values of the single `columns` entry.
///
/// Output columns are the index columns, then one column per distinct
/// column key (first-seen order). With several value columns each output
/// column is named `{value}_{key}`. Rows whose column key is null are not
/// counted in any cell.
///
/// A generated label that repeats an index column or another label is a
/// validation error, since the output row could hold only one of them.
pub(crate) fn pivot(dataset: &Dataset, config: &PivotConfig) -> Result<Dataset> {
    let Some(pivot_column) = config.columns.first() else {
        return Ok(Dataset::new(config.index.clone()));
    };

    let mut keys: Vec<Value> = Vec::new();
    let mut seen: HashMap<ValueKey, usize> = HashMap::new();
    for value in dataset.values(pivot_column).filter(|v| !v.is_null()) {
        seen.entry(value.key()).or_insert_with(|| {
            keys.push(value.clone());
            keys.len() - 1
        });
    }

    let label = |value_column: &str, key: &Value| {
        if config.values.len() == 1 {
            key.render()
        } else {
            format!("{value_column}_{}", key.render())
        }
    };
    let mut columns = config.index.clone();
    for value_column in &config.values {
        for key in &keys {
            let name = label(value_column.as_str(), key);
            if columns.contains(&name) {
                return Err(EngineError::validation(
                    format!("pivot column '{name}' clashes with an existing output column"),
                    config,
                ));
            }
            columns.push(name);
        }
    }

    let fill = config.fill_value.map_or(Value::Null, Value::Number);
    let rows = partition(&dataset.rows, &config.index)
        .into_iter()
        .map(|group| {
            let mut row: Row = config.index.iter().cloned().zip(group.key).collect();
            let mut by_key: Vec<Vec<&Row>> = vec![Vec::new(); keys.len()];
            for member in group.rows.iter().copied() {
                if let Some(slot) = seen.get(&Dataset::cell(member, pivot_column).key()) {
                    by_key[*slot].push(member);
                }
            }
            for value_column in &config.values {
                for (key, members) in keys.iter().zip(&by_key) {
                    let cell = if members.is_empty() {
                        fill.clone()
                    } else {
                        let cells: Vec<&Value> = members
                            .iter()
                            .map(|r| Dataset::cell(r, value_column))
                            .collect();
                        evaluate(config.agg_fn, &cells)
                    };
                    row.insert(label(value_column.as_str(), key), cell);
                }
            }
            row
        })
        .collect();

    Ok(Dataset {
        columns,
        rows,
        schema: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabrule_model::AggFn;

    fn sales() -> Dataset {
        Dataset::from_records(
            &["Region", "Quarter", "Amount"],
            vec![
                vec!["north".into(), "Q1".into(), 10.0.into()],
                vec!["north".into(), "Q2".into(), 20.0.into()],
                vec!["south".into(), "Q1".into(), 5.0.into()],
                vec!["north".into(), "Q1".into(), 1.0.into()],
            ],
        )
    }

    fn config(fill_value: Option<f64>) -> PivotConfig {
        PivotConfig {
            index: vec!["Region".into()],
            columns: vec!["Quarter".into()],
            values: vec!["Amount".into()],
            agg_fn: AggFn::Sum,
            fill_value,
            cleaning_rules: Default::default(),
        }
    }

    #[test]
    fn missing_cells_are_null() {
        let out = pivot(&sales(), &config(None)).unwrap();
        assert_eq!(out.columns, vec!["Region", "Q1", "Q2"]);
        assert_eq!(Dataset::cell(&out.rows[0], "Q1"), &Value::from(11.0));
        assert_eq!(Dataset::cell(&out.rows[0], "Q2"), &Value::from(20.0));
        assert_eq!(Dataset::cell(&out.rows[1], "Q2"), &Value::Null);
    }

    #[test]
    fn fill_value_replaces_missing_cells() {
        let out = pivot(&sales(), &config(Some(0.0))).unwrap();
        assert_eq!(Dataset::cell(&out.rows[1], "Q2"), &Value::from(0.0));
    }

    #[test]
    fn label_matching_index_column_is_rejected() {
        let ds = Dataset::from_records(
            &["Region", "Kind", "Amount"],
            vec![
                vec!["north".into(), "Region".into(), 1.0.into()],
                vec!["north".into(), "Other".into(), 2.0.into()],
            ],
        );
        let mut clash = config(None);
        clash.columns = vec!["Kind".into()];
        let err = pivot(&ds, &clash).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(err.to_string().contains("Region"), "{err}");
    }

    #[test]
    fn keys_rendering_alike_are_rejected() {
        let ds = Dataset::from_records(
            &["Region", "Quarter", "Amount"],
            vec![
                vec!["north".into(), 1.0.into(), 1.0.into()],
                vec!["north".into(), "1".into(), 2.0.into()],
            ],
        );
        assert!(pivot(&ds, &config(None)).is_err());
    }
}
