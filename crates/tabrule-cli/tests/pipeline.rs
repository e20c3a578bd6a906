//! Integration tests for the CLI pipeline helpers.

use std::fs;
use std::path::Path;

use serde_json::json;
use tabrule_cli::pipeline::{
    RuleCheck, Session, build_selection, check_rule_document, file_id_for, infer_file_schema,
    load_config,
};
use tabrule_core::{EngineConfig, RuleSelection};
use tabrule_model::{Caller, ColumnType, ExecutionState, Value};
use tempfile::TempDir;

const LEDGER: &str = "\
Account,Type,Amount,Posted
A1,CR,\"$1,200.00\",2024-01-03
A1,DR,$300.00,2024-01-09
A2,cr,£50,2024-02-11
";

fn rule_document() -> serde_json::Value {
    json!({
        "normalization": {
            "amounts": {"columns": {"Amount": {"kind": "strip_currency"}}}
        },
        "aggregation": {
            "by_account": {
                "type": "group_by",
                "group_by": ["Account"],
                "aggregations": {"Amount": ["sum"]}
            }
        },
        "flag": {
            "large": {
                "column": "Amount_sum",
                "operator": "gt",
                "threshold": 1000,
                "reason": "large balance"
            }
        }
    })
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_id_is_file_stem() {
    assert_eq!(file_id_for(Path::new("/data/ledger_2024.csv")), "ledger_2024");
    assert_eq!(file_id_for(Path::new("")), "input");
}

#[test]
fn selection_skips_blank_names() {
    let selection = build_selection(
        &["amounts".to_string(), " ".to_string()],
        Some("by_account"),
        &[" large ".to_string()],
    );
    assert_eq!(
        selection,
        RuleSelection::new()
            .normalize("amounts")
            .aggregate("by_account")
            .flag("large")
    );
    assert!(build_selection(&[], Some(""), &[]).is_empty());
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(load_config(None).unwrap(), EngineConfig::default());
}

#[test]
fn schema_of_csv_file() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "ledger.csv", LEDGER);
    let schema = infer_file_schema(&input, &EngineConfig::default()).unwrap();
    assert_eq!(schema.columns.len(), 4);
    assert_eq!(schema.column_type("Posted"), Some(ColumnType::Datetime));
}

#[test]
fn rule_check_counts_each_kind() {
    let dir = TempDir::new().unwrap();
    let rules = write(dir.path(), "rules.json", &rule_document().to_string());
    let check = check_rule_document(&rules).unwrap();
    assert_eq!(
        check,
        RuleCheck {
            normalization: 1,
            aggregation: 1,
            flag: 1,
        }
    );
    assert_eq!(check.total(), 3);
}

#[test]
fn rule_check_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let mut document = rule_document();
    document["aggregation"]["by_account"]["type"] = json!("rolling_window");
    let rules = write(dir.path(), "rules.json", &document.to_string());
    let err = check_rule_document(&rules).unwrap_err();
    assert!(format!("{err:#}").contains("aggregation/by_account"), "{err:#}");
}

#[test]
fn session_runs_rules_and_exports() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "ledger.csv", LEDGER);
    let rules = write(dir.path(), "rules.json", &rule_document().to_string());
    let session = Session::open(
        &EngineConfig::default(),
        &input,
        &rules,
        Caller::new("tester", "operator"),
    )
    .unwrap();
    assert_eq!(session.file_id, "ledger");

    let mut seen = Vec::new();
    let selection = build_selection(
        &["amounts".to_string()],
        Some("by_account"),
        &["large".to_string()],
    );
    let result = session.run(selection, |percent| seen.push(percent)).unwrap();
    assert_eq!(
        result.columns,
        vec!["Account", "Amount_sum", "flagged", "flag_reason"]
    );
    assert_eq!(result.rows[0]["Amount_sum"], Value::from(1500.0));
    assert_eq!(result.rows[1]["flagged"], Value::Bool(false));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));

    let output = dir.path().join("out.csv");
    session.export(&result, &output).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "Account,Amount_sum,flagged,flag_reason\n\
         A1,1500,true,large balance\n\
         A2,50,false,\n"
    );
    assert_eq!(
        session.engine.state(&session.file_id),
        Some(ExecutionState::Exported)
    );
    session.close();
}

#[test]
fn session_reports_unknown_rule() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "ledger.csv", LEDGER);
    let rules = write(dir.path(), "rules.json", &rule_document().to_string());
    let session = Session::open(
        &EngineConfig::default(),
        &input,
        &rules,
        Caller::new("tester", "operator"),
    )
    .unwrap();
    let err = session
        .run(RuleSelection::new().flag("missing"), |_| {})
        .unwrap_err();
    assert!(err.to_string().contains("missing"), "{err}");
}
