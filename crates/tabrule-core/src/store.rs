//! Process-wide registry of named rules.
//!
//! Rules live in per-`(kind, name)` slots. Writers lock only the slot they
//! touch, so creates under different names never wait on each other; the
//! outer map lock is taken for writing only to add or remove a slot or to
//! publish an import atomically. Writers lock the map before a slot. Readers
//! get `Arc<Rule>` snapshots that are never mutated afterwards.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use tabrule_model::{EngineError, Result, Rule, RuleConfig, RuleDocument, RuleKind};
use tabrule_transform::FlagPredicate;
use tracing::{debug, info};

type Slot = Arc<RwLock<Option<Arc<Rule>>>>;
type Key = (RuleKind, String);

fn poisoned<T>(_: T) -> EngineError {
    EngineError::Storage("rule store lock poisoned".to_string())
}

/// Parse and fully check a raw rule config.
///
/// Beyond shape checks this compiles flag predicates, so an invalid regex
/// is rejected when the rule is stored rather than when it runs.
pub fn parse_rule_config(kind: RuleKind, raw: &serde_json::Value) -> Result<RuleConfig> {
    let config = RuleConfig::parse(kind, raw)?;
    if let RuleConfig::Flag(flag) = &config {
        FlagPredicate::compile(flag)?;
    }
    Ok(config)
}

/// Registry of normalization, aggregation and flag rules.
#[derive(Debug, Default)]
pub struct RuleStore {
    slots: RwLock<BTreeMap<Key, Slot>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `raw` and store it under `(kind, name)`.
    ///
    /// An existing rule with the same name is replaced and `created_at` is
    /// re-stamped.
    pub fn create(&self, kind: RuleKind, name: &str, raw: &serde_json::Value) -> Result<Arc<Rule>> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation {
                message: "rule name may not be empty".to_string(),
                config: raw.clone(),
            });
        }
        let config = parse_rule_config(kind, raw)?;
        self.put(Rule::new(name, config))
    }

    /// Store an already-typed rule.
    ///
    /// The slot is written while the map lock is held, so a concurrent
    /// delete cannot unlink it in between.
    pub fn put(&self, rule: Rule) -> Result<Arc<Rule>> {
        let key = (rule.kind, rule.name.clone());
        let rule = Arc::new(rule);
        let replaced = {
            let map = self.slots.read().map_err(poisoned)?;
            match map.get(&key) {
                Some(slot) => Some(fill(slot, &rule)?),
                None => None,
            }
        };
        let replaced = match replaced {
            Some(replaced) => replaced,
            None => {
                let mut map = self.slots.write().map_err(poisoned)?;
                fill(map.entry(key).or_default(), &rule)?
            }
        };
        debug!(kind = %rule.kind, name = %rule.name, replaced, "stored rule");
        Ok(rule)
    }

    pub fn get(&self, kind: RuleKind, name: &str) -> Result<Arc<Rule>> {
        let slot = self.slot(kind, name)?;
        let guard = slot.read().map_err(poisoned)?;
        guard.clone().ok_or_else(|| not_found(kind, name))
    }

    /// Rules of one kind, ordered by name.
    pub fn list(&self, kind: RuleKind) -> Result<Vec<Arc<Rule>>> {
        let slots: Vec<Slot> = {
            let map = self.slots.read().map_err(poisoned)?;
            map.iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, slot)| Arc::clone(slot))
                .collect()
        };
        let mut rules = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(rule) = slot.read().map_err(poisoned)?.clone() {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Remove a rule. Fails with `NotFound` when it does not exist.
    pub fn delete(&self, kind: RuleKind, name: &str) -> Result<Arc<Rule>> {
        let slot = self.slot(kind, name)?;
        let mut guard = slot.write().map_err(poisoned)?;
        let removed = guard.take().ok_or_else(|| not_found(kind, name))?;
        debug!(%kind, name, "deleted rule");
        Ok(removed)
    }

    /// Total number of stored rules.
    pub fn len(&self) -> Result<usize> {
        let mut total = 0;
        for kind in RuleKind::ALL {
            total += self.list(kind)?.len();
        }
        Ok(total)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every stored rule grouped by kind.
    pub fn export(&self) -> Result<RuleDocument> {
        let mut document = RuleDocument::default();
        for kind in RuleKind::ALL {
            let section = document.section_mut(kind);
            for rule in self.list(kind)? {
                section.insert(rule.name.clone(), rule.config.to_json());
            }
        }
        Ok(document)
    }

    /// Merge a rule document into the registry.
    ///
    /// Every rule is validated first. If any one is invalid the whole
    /// document is rejected with [`EngineError::Import`] and the registry is
    /// left untouched. Returns the number of rules merged.
    pub fn import(&self, document: &RuleDocument) -> Result<usize> {
        let mut parsed: Vec<Rule> = Vec::with_capacity(document.len());
        for (kind, name, raw) in document.entries() {
            let label = format!("{kind}/{name}");
            if name.trim().is_empty() {
                return Err(EngineError::Import {
                    rule: label,
                    message: "rule name may not be empty".to_string(),
                });
            }
            let config = parse_rule_config(kind, raw).map_err(|e| EngineError::Import {
                rule: label,
                message: e.to_string(),
            })?;
            parsed.push(Rule::new(name, config));
        }

        let mut map = self.slots.write().map_err(poisoned)?;
        let slots: Vec<Slot> = parsed
            .iter()
            .map(|rule| Arc::clone(map.entry((rule.kind, rule.name.clone())).or_default()))
            .collect();
        // Lock every target slot before publishing so readers see all of the
        // import or none of it.
        let mut guards: Vec<RwLockWriteGuard<'_, Option<Arc<Rule>>>> = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(slot.write().map_err(poisoned)?);
        }
        let count = parsed.len();
        for (guard, rule) in guards.iter_mut().zip(parsed) {
            **guard = Some(Arc::new(rule));
        }
        drop(guards);
        drop(map);
        info!(count, "imported rules");
        Ok(count)
    }

    fn slot(&self, kind: RuleKind, name: &str) -> Result<Slot> {
        let map = self.slots.read().map_err(poisoned)?;
        map.get(&(kind, name.to_string()))
            .map(Arc::clone)
            .ok_or_else(|| not_found(kind, name))
    }
}

/// Publish `rule` in `slot`, returning whether it replaced another rule.
fn fill(slot: &Slot, rule: &Arc<Rule>) -> Result<bool> {
    let mut guard = slot.write().map_err(poisoned)?;
    Ok(guard.replace(Arc::clone(rule)).is_some())
}

fn not_found(kind: RuleKind, name: &str) -> EngineError {
    EngineError::NotFound(format!("{kind} rule '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cr_dr() -> serde_json::Value {
        json!({"columns": {"Type": {"kind": "cr_dr_mapping"}}})
    }

    #[test]
    fn list_is_name_ordered_and_skips_deleted() {
        let store = RuleStore::new();
        store.create(RuleKind::Normalization, "b", &cr_dr()).unwrap();
        store.create(RuleKind::Normalization, "a", &cr_dr()).unwrap();
        store.delete(RuleKind::Normalization, "b").unwrap();
        let names: Vec<String> = store
            .list(RuleKind::Normalization)
            .unwrap()
            .iter()
            .map(|rule| rule.name.clone())
            .collect();
        assert_eq!(names, vec!["a"]);
        assert!(store.list(RuleKind::Flag).unwrap().is_empty());
    }

    #[test]
    fn delete_twice_is_not_found() {
        let store = RuleStore::new();
        store.create(RuleKind::Normalization, "r1", &cr_dr()).unwrap();
        store.delete(RuleKind::Normalization, "r1").unwrap();
        let err = store.delete(RuleKind::Normalization, "r1").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(matches!(
            store.get(RuleKind::Normalization, "r1"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn delete_releases_slot() {
        let store = RuleStore::new();
        for index in 0..50 {
            store
                .create(RuleKind::Normalization, &format!("r{index}"), &cr_dr())
                .unwrap();
        }
        for index in 0..50 {
            store
                .delete(RuleKind::Normalization, &format!("r{index}"))
                .unwrap();
        }
        assert!(store.slots.read().unwrap().is_empty());

        store.create(RuleKind::Normalization, "r7", &cr_dr()).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.slots.read().unwrap().len(), 1);
    }

    #[test]
    fn bad_regex_is_rejected_on_create() {
        let store = RuleStore::new();
        let raw = json!({"column": "Ref", "operator": "regex", "threshold": "(", "reason": "x"});
        let err = store.create(RuleKind::Flag, "ref", &raw).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn same_name_in_other_kind_is_independent() {
        let store = RuleStore::new();
        store.create(RuleKind::Normalization, "r", &cr_dr()).unwrap();
        let flag = json!({"column": "Amount", "operator": "gt", "threshold": 10, "reason": "big"});
        store.create(RuleKind::Flag, "r", &flag).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get(RuleKind::Flag, "r").unwrap().kind, RuleKind::Flag);
    }
}
