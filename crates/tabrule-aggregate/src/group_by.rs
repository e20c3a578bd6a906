use std::collections::HashMap;

use tabrule_model::{AggFn, Dataset, Row, Value, ValueKey};

use crate::functions::{evaluate, output_name};

/// Rows sharing one key, in first-seen order of the key.
pub(crate) struct Group<'a> {
    /// Key cells from the first row of the group.
    pub key: Vec<Value>,
    pub rows: Vec<&'a Row>,
}

/// Partition rows by the tuple of `columns` values.
///
/// Groups come back in the order their key first appears. Null key cells
/// form their own group.
pub(crate) fn partition<'a>(rows: impl IntoIterator<Item = &'a Row>, columns: &[String]) -> Vec<Group<'a>> {
    let mut index: HashMap<Vec<ValueKey>, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();
    for row in rows {
        let cells: Vec<&Value> = columns.iter().map(|c| Dataset::cell(row, c)).collect();
        let key: Vec<ValueKey> = cells.iter().map(|v| v.key()).collect();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                key: cells.iter().map(|v| (*v).clone()).collect(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

/// Group-by aggregation producing `{column}_{function}` output columns.
pub(crate) fn group_by(
    dataset: &Dataset,
    group_by: &[String],
    aggregations: &[(String, Vec<AggFn>)],
) -> Dataset {
    let mut columns: Vec<String> = group_by.to_vec();
    for (column, functions) in aggregations {
        columns.extend(functions.iter().map(|f| output_name(column, *f)));
    }

    let rows = partition(&dataset.rows, group_by)
        .into_iter()
        .map(|group| {
            let mut row: Row = group_by.iter().cloned().zip(group.key).collect();
            for (column, functions) in aggregations {
                let cells: Vec<&Value> =
                    group.rows.iter().map(|r| Dataset::cell(r, column)).collect();
                for function in functions {
                    row.insert(output_name(column, *function), evaluate(*function, &cells));
                }
            }
            row
        })
        .collect();

    Dataset {
        columns,
        rows,
        schema: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_keeps_first_seen_order() {
        let ds = Dataset::from_records(
            &["k"],
            vec![vec!["b".into()], vec!["a".into()], vec!["b".into()], vec![Value::Null]],
        );
        let groups = partition(&ds.rows, &["k".to_string()]);
        let keys: Vec<&Value> = groups.iter().map(|g| &g.key[0]).collect();
        assert_eq!(keys, vec![&Value::from("b"), &Value::from("a"), &Value::Null]);
        assert_eq!(groups[0].rows.len(), 2);
    }

    #[test]
    fn numeric_keys_group_across_representations() {
        let ds = Dataset::from_records(
            &["k", "v"],
            vec![
                vec![Value::from(1.0), Value::from(2.0)],
                vec![Value::from(1), Value::from(3.0)],
            ],
        );
        let out = group_by(
            &ds,
            &["k".to_string()],
            &[("v".to_string(), vec![AggFn::Sum, AggFn::Last])],
        );
        assert_eq!(out.columns, vec!["k", "v_sum", "v_last"]);
        assert_eq!(out.height(), 1);
        assert_eq!(Dataset::cell(&out.rows[0], "v_sum"), &Value::from(5.0));
        assert_eq!(Dataset::cell(&out.rows[0], "v_last"), &Value::from(3.0));
    }
}
