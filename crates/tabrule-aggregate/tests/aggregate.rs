//! Aggregation engine behaviour over small transaction tables.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tabrule_aggregate::AggregationEngine;
use tabrule_model::{AggregationConfig, Dataset, EngineError, Value};

fn transactions() -> Dataset {
    Dataset::from_records(
        &["Account", "Type", "Amount"],
        vec![
            vec!["A1".into(), "CR".into(), 100.0.into()],
            vec!["A1".into(), "DR".into(), 40.0.into()],
            vec!["A2".into(), "CR".into(), 50.0.into()],
        ],
    )
}

fn config(json: serde_json::Value) -> AggregationConfig {
    serde_json::from_value(json).expect("aggregation config")
}

fn rendered(table: &Dataset) -> Vec<BTreeMap<String, String>> {
    table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(column, value)| (column.clone(), value.render()))
                .collect()
        })
        .collect()
}

#[test]
fn group_by_sums_and_counts_per_account() {
    let out = AggregationEngine::default()
        .aggregate(
            &transactions(),
            &config(serde_json::json!({
                "type": "group_by",
                "group_by": ["Account"],
                "aggregations": {"Amount": ["sum", "count"]}
            })),
        )
        .expect("group by");
    assert_eq!(out.table.columns, vec!["Account", "Amount_sum", "Amount_count"]);
    insta::assert_json_snapshot!(rendered(&out.table), @r#"
    [
      {
        "Account": "A1",
        "Amount_count": "2",
        "Amount_sum": "140"
      },
      {
        "Account": "A2",
        "Amount_count": "1",
        "Amount_sum": "50"
      }
    ]
    "#);
}

#[test]
fn unknown_column_is_rejected_with_config() {
    let raw = serde_json::json!({
        "type": "group_by",
        "group_by": ["Branch"],
        "aggregations": {"Amount": ["sum"]}
    });
    let err = AggregationEngine::default()
        .aggregate(&transactions(), &config(raw.clone()))
        .unwrap_err();
    match err {
        EngineError::Validation { message, config } => {
            assert!(message.contains("Branch"));
            assert_eq!(config, raw);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn transaction_summary_pattern_groups_by_account_and_type() {
    let ds = Dataset::from_records(
        &["account", "type", "amount"],
        vec![
            vec!["A1".into(), "Credit".into(), 10.0.into()],
            vec!["A1".into(), "Credit".into(), 5.0.into()],
            vec!["A1".into(), "Debit".into(), 3.0.into()],
        ],
    );
    let out = AggregationEngine::default()
        .aggregate(
            &ds,
            &config(serde_json::json!({"type": "pattern", "name": "transaction_summary"})),
        )
        .expect("pattern");
    assert_eq!(
        out.table.columns,
        vec!["account", "type", "amount_sum", "amount_count"]
    );
    assert_eq!(out.table.height(), 2);
    assert_eq!(Dataset::cell(&out.table.rows[0], "amount_sum"), &Value::from(15.0));
}

#[test]
fn pattern_on_dataset_without_columns_fails() {
    let err = AggregationEngine::default()
        .aggregate(
            &transactions(),
            &config(serde_json::json!({"type": "pattern", "name": "regional_summary"})),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[test]
fn summary_stats_defaults_to_numeric_columns() {
    let out = AggregationEngine::default()
        .aggregate(
            &transactions(),
            &config(serde_json::json!({"type": "summary_stats"})),
        )
        .expect("summary");
    assert_eq!(out.table.height(), 1);
    assert_eq!(Dataset::cell(&out.table.rows[0], "column"), &Value::from("Amount"));
    assert_eq!(Dataset::cell(&out.table.rows[0], "max"), &Value::from(100.0));
}

#[test]
fn time_series_with_additional_columns() {
    let ds = Dataset::from_records(
        &["Date", "Amount", "Fee"],
        vec![
            vec!["2024-01-03".into(), 10.0.into(), 1.0.into()],
            vec!["2024-05-20".into(), 20.0.into(), 2.0.into()],
            vec!["2024-02-11".into(), 30.0.into(), 3.0.into()],
        ],
    );
    let out = AggregationEngine::default()
        .aggregate(
            &ds,
            &config(serde_json::json!({
                "type": "time_series",
                "date_column": "Date",
                "value_column": "Amount",
                "frequency": "Q",
                "additional_columns": ["Fee"]
            })),
        )
        .expect("time series");
    assert_eq!(out.table.columns, vec!["Date", "Amount_sum", "Fee_sum"]);
    let rows = rendered(&out.table);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Date"], "2024-01-01");
    assert_eq!(rows[0]["Amount_sum"], "40");
    assert_eq!(rows[1]["Date"], "2024-04-01");
    assert_eq!(rows[1]["Fee_sum"], "2");
}

proptest! {
    #[test]
    fn group_by_is_deterministic_in_first_seen_order(
        rows in prop::collection::vec((0u8..5, -1000i32..1000), 0..40),
    ) {
        let records: Vec<Vec<Value>> = rows
            .iter()
            .map(|(key, amount)| vec![Value::from(format!("K{key}")), Value::from(*amount)])
            .collect();
        let ds = Dataset::from_records(&["Key", "Amount"], records);
        let cfg = config(serde_json::json!({
            "type": "group_by",
            "group_by": ["Key"],
            "aggregations": {"Amount": ["sum", "mean", "std", "first"]}
        }));
        let engine = AggregationEngine::default();
        let first = engine.aggregate(&ds, &cfg).unwrap();
        let second = engine.aggregate(&ds, &cfg).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first.table.rows).unwrap(),
            serde_json::to_string(&second.table.rows).unwrap()
        );

        let mut expected_order: Vec<String> = Vec::new();
        for (key, _) in &rows {
            let name = format!("K{key}");
            if !expected_order.contains(&name) {
                expected_order.push(name);
            }
        }
        let actual_order: Vec<String> = first.table.values("Key").map(Value::render).collect();
        prop_assert_eq!(actual_order, expected_order);
    }
}
