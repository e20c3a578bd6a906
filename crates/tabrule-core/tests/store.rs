//! Tests for the rule store: overwrite, import atomicity and round trips.

use std::sync::Arc;

use serde_json::json;
use tabrule_core::RuleStore;
use tabrule_model::{EngineError, RuleConfig, RuleDocument, RuleKind};

fn seeded() -> RuleStore {
    let store = RuleStore::new();
    store
        .create(
            RuleKind::Normalization,
            "types",
            &json!({"columns": {"Type": {"kind": "cr_dr_mapping"}}}),
        )
        .unwrap();
    store
        .create(
            RuleKind::Aggregation,
            "by_account",
            &json!({
                "type": "group_by",
                "group_by": ["Account"],
                "aggregations": {"Amount": ["sum", "count"]}
            }),
        )
        .unwrap();
    store
        .create(
            RuleKind::Flag,
            "ref",
            &json!({
                "column": "Reference",
                "operator": "contains",
                "threshold": "TEST",
                "reason": "test ref"
            }),
        )
        .unwrap();
    store
}

fn contents(store: &RuleStore) -> Vec<(RuleKind, String, RuleConfig)> {
    RuleKind::ALL
        .into_iter()
        .flat_map(|kind| store.list(kind).unwrap())
        .map(|rule| (rule.kind, rule.name.clone(), rule.config.clone()))
        .collect()
}

#[test]
fn create_with_existing_name_overwrites() {
    let store = RuleStore::new();
    let cfg_a = json!({"columns": {"Type": {"kind": "cr_dr_mapping"}}});
    let cfg_b = json!({"columns": {"Account": {"kind": "account_standardize"}}});
    store.create(RuleKind::Normalization, "r1", &cfg_a).unwrap();
    store.create(RuleKind::Normalization, "r1", &cfg_b).unwrap();

    let rule = store.get(RuleKind::Normalization, "r1").unwrap();
    assert_eq!(rule.config.to_json(), cfg_b);
    assert_eq!(store.list(RuleKind::Normalization).unwrap().len(), 1);
}

#[test]
fn export_groups_rules_by_kind() {
    let document = seeded().export().unwrap();
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(document, @r#"
        {
          "normalization": {
            "types": {
              "columns": {
                "Type": {
                  "kind": "cr_dr_mapping"
                }
              }
            }
          },
          "aggregation": {
            "by_account": {
              "aggregations": {
                "Amount": [
                  "sum",
                  "count"
                ]
              },
              "group_by": [
                "Account"
              ],
              "type": "group_by"
            }
          },
          "flag": {
            "ref": {
              "column": "Reference",
              "operator": "contains",
              "reason": "test ref",
              "threshold": "TEST"
            }
          }
        }
        "#);
    });
}

#[test]
fn import_of_export_is_identity() {
    let source = seeded();
    let target = RuleStore::new();
    let imported = target.import(&source.export().unwrap()).unwrap();
    assert_eq!(imported, 3);
    assert_eq!(contents(&target), contents(&source));

    // Importing into the source itself changes nothing either.
    source.import(&source.export().unwrap()).unwrap();
    assert_eq!(contents(&source), contents(&target));
}

#[test]
fn one_invalid_rule_rejects_whole_import() {
    let store = seeded();
    let before = contents(&store);

    let mut document = RuleDocument::default();
    document.normalization.insert(
        "accounts".to_string(),
        json!({"columns": {"Account": {"kind": "account_standardize"}}}),
    );
    document.aggregation.insert(
        "broken".to_string(),
        json!({"type": "pivot", "index": ["Account"], "values": ["Amount"]}),
    );

    let err = store.import(&document).unwrap_err();
    match err {
        EngineError::Import { rule, .. } => assert_eq!(rule, "aggregation/broken"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(contents(&store), before);
    assert!(store.get(RuleKind::Normalization, "accounts").is_err());
}

#[test]
fn unknown_sections_are_rejected_when_parsing_document() {
    let parsed: Result<RuleDocument, _> =
        serde_json::from_value(json!({"cleaning": {"x": {}}}));
    assert!(parsed.is_err());
}

#[test]
fn concurrent_creates_under_distinct_names_all_land() {
    let store = Arc::new(RuleStore::new());
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for m in 0..10 {
                    store
                        .create(
                            RuleKind::Flag,
                            &format!("rule_{n}_{m}"),
                            &json!({
                                "column": "Amount",
                                "operator": "gt",
                                "threshold": m,
                                "reason": "big"
                            }),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.list(RuleKind::Flag).unwrap().len(), 80);
}
