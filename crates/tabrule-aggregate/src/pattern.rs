//! Built-in composite aggregations.

use std::collections::BTreeMap;

use tabrule_model::{AggFn, CleaningRules, GroupByConfig, PatternName};

/// The group-by a pattern expands to.
pub fn pattern_group_by(name: PatternName, cleaning_rules: &CleaningRules) -> GroupByConfig {
    let (group_by, functions): (&[&str], &[AggFn]) = match name {
        PatternName::TransactionSummary => (&["account", "type"], &[AggFn::Sum, AggFn::Count]),
        PatternName::CustomerSummary => {
            (&["customer"], &[AggFn::Sum, AggFn::Mean, AggFn::Count])
        }
        PatternName::RegionalSummary => (&["region"], &[AggFn::Sum, AggFn::Count]),
    };
    GroupByConfig {
        group_by: group_by.iter().map(ToString::to_string).collect(),
        value_columns: Vec::new(),
        aggregations: BTreeMap::from([("amount".to_string(), functions.to_vec())]),
        cleaning_rules: cleaning_rules.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_summary_shape() {
        let config = pattern_group_by(PatternName::CustomerSummary, &CleaningRules::default());
        assert_eq!(config.group_by, vec!["customer"]);
        assert_eq!(
            config.resolved_aggregations(),
            vec![("amount", vec![AggFn::Sum, AggFn::Mean, AggFn::Count])]
        );
    }
}
