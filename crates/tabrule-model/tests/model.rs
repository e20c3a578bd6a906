//! Tests for tabrule-model types.

use tabrule_model::{
    AggFn, AggregationConfig, AuditEntry, AuditOperation, AuditStatus, Caller, CleaningRules,
    EngineError, MissingValuePolicy, OutlierPolicy, RuleConfig, RuleKind,
};

#[test]
fn aggregation_config_serializes_tagged() {
    let raw = serde_json::json!({
        "type": "time_series",
        "date_column": "Date",
        "value_column": "Amount",
        "frequency": "M",
        "aggregation": "average",
        "cleaning_rules": {"missing_values": "drop", "outliers": "remove"}
    });
    let config = RuleConfig::parse(RuleKind::Aggregation, &raw).expect("parse time series");
    insta::assert_json_snapshot!(config, @r#"
    {
      "type": "time_series",
      "date_column": "Date",
      "value_column": "Amount",
      "frequency": "M",
      "agg_fn": "mean",
      "cleaning_rules": {
        "missing_values": "drop",
        "outliers": "remove"
      }
    }
    "#);
}

#[test]
fn missing_required_field_is_validation_error() {
    let raw = serde_json::json!({"type": "pivot", "index": ["Region"], "values": ["Amount"]});
    let err = RuleConfig::parse(RuleKind::Aggregation, &raw).unwrap_err();
    match err {
        EngineError::Validation { message, config } => {
            assert!(message.contains("columns"), "message: {message}");
            assert_eq!(config, raw);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn group_by_without_functions_is_rejected() {
    let raw = serde_json::json!({"type": "group_by", "group_by": ["Account"]});
    assert!(matches!(
        RuleConfig::parse(RuleKind::Aggregation, &raw),
        Err(EngineError::Validation { .. })
    ));
}

#[test]
fn ordering_operator_needs_numeric_threshold() {
    let raw = serde_json::json!({
        "column": "Amount",
        "operator": "gte",
        "threshold": "lots",
        "reason": "big"
    });
    assert!(RuleConfig::parse(RuleKind::Flag, &raw).is_err());
}

#[test]
fn cleaning_rules_default_keeps_outliers() {
    let rules: CleaningRules = serde_json::from_str("{}").expect("empty cleaning rules");
    assert!(rules.is_noop());
    let rules = rules.with_missing_values(MissingValuePolicy::FillMode);
    assert_eq!(rules.outliers, OutlierPolicy::Keep);
    assert!(!rules.is_noop());
}

#[test]
fn agg_fn_names_round_trip_through_from_str() {
    for function in AggFn::ALL {
        assert_eq!(function.as_str().parse::<AggFn>(), Ok(function));
    }
    assert_eq!("AVERAGE".parse::<AggFn>(), Ok(AggFn::Mean));
}

#[test]
fn audit_entry_serializes_snake_case() {
    let entry = AuditEntry {
        id: 7,
        file_id: "f1".to_string(),
        caller: Caller::new("u1", "analyst"),
        operation: AuditOperation::InferSchema,
        status: AuditStatus::Failure,
        details: "schema error: dataset has no columns".to_string(),
        timestamp: chrono::DateTime::from_timestamp(0, 0).expect("epoch"),
    };
    let json = serde_json::to_value(&entry).expect("serialize entry");
    assert_eq!(json["operation"], "infer_schema");
    assert_eq!(json["status"], "failure");
    assert_eq!(json["caller"]["role"], "analyst");
    let parsed: AggregationConfig = serde_json::from_value(serde_json::json!({
        "type": "pattern",
        "name": "regional_summary"
    }))
    .expect("pattern config");
    assert_eq!(parsed.kind_name(), "pattern");
}
