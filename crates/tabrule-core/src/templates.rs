//! Built-in rule templates.
//!
//! Templates are constructed once and never mutated; instantiating one
//! clones its config into a new named [`Rule`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tabrule_model::{
    AggFn, AggregationConfig, CleaningRules, EngineError, FlagConfig, FlagOperator, Frequency,
    GroupByConfig, NormalizationConfig, PatternConfig, PatternName, Result, Rule, RuleKind,
    RuleTemplate, TimeSeriesConfig, TransformKind, Value,
};

static TEMPLATES: LazyLock<Vec<RuleTemplate>> = LazyLock::new(build_templates);

fn build_templates() -> Vec<RuleTemplate> {
    let pattern = |name| {
        AggregationConfig::Pattern(PatternConfig {
            name,
            cleaning_rules: CleaningRules::default(),
        })
    };
    vec![
        RuleTemplate {
            name: "currency_cleanup",
            kind: RuleKind::Normalization,
            description: "Strip currency symbols and separators from amount",
            config: NormalizationConfig::single("amount", TransformKind::StripCurrency).into(),
        },
        RuleTemplate {
            name: "date_format",
            kind: RuleKind::Normalization,
            description: "Rewrite date as YYYY-MM-DD",
            config: NormalizationConfig::single("date", TransformKind::DateIso8601).into(),
        },
        RuleTemplate {
            name: "transaction_type",
            kind: RuleKind::Normalization,
            description: "Map C/CR/D/DR transaction codes to Credit and Debit",
            config: NormalizationConfig::single(
                "transaction_type",
                TransformKind::CustomMapping {
                    mapping: BTreeMap::from(
                        [("C", "Credit"), ("CR", "Credit"), ("D", "Debit"), ("DR", "Debit")]
                            .map(|(from, to)| (from.to_string(), to.to_string())),
                    ),
                },
            )
            .into(),
        },
        RuleTemplate {
            name: "transaction_summary",
            kind: RuleKind::Aggregation,
            description: "Sum, count and mean of amount per transaction type and account",
            config: AggregationConfig::GroupBy(GroupByConfig {
                group_by: vec!["transaction_type".to_string(), "account".to_string()],
                value_columns: Vec::new(),
                aggregations: BTreeMap::from([(
                    "amount".to_string(),
                    vec![AggFn::Sum, AggFn::Count, AggFn::Mean],
                )]),
                cleaning_rules: CleaningRules::default(),
            })
            .into(),
        },
        RuleTemplate {
            name: "monthly_time_series",
            kind: RuleKind::Aggregation,
            description: "Monthly total of amount by date",
            config: AggregationConfig::TimeSeries(TimeSeriesConfig {
                date_column: "date".to_string(),
                value_column: "amount".to_string(),
                frequency: Frequency::Month,
                agg_fn: AggFn::Sum,
                additional_columns: Vec::new(),
                cleaning_rules: CleaningRules::default(),
            })
            .into(),
        },
        RuleTemplate {
            name: "customer_summary",
            kind: RuleKind::Aggregation,
            description: "Sum, mean and count of amount per customer",
            config: pattern(PatternName::CustomerSummary).into(),
        },
        RuleTemplate {
            name: "regional_summary",
            kind: RuleKind::Aggregation,
            description: "Sum and count of amount per region",
            config: pattern(PatternName::RegionalSummary).into(),
        },
        RuleTemplate {
            name: "high_amount",
            kind: RuleKind::Flag,
            description: "Flag amounts above 5000",
            config: FlagConfig {
                column: "amount".to_string(),
                operator: FlagOperator::Gt,
                threshold: Value::from(5000.0),
                reason: "High value transaction".to_string(),
            }
            .into(),
        },
        RuleTemplate {
            name: "suspicious_reference",
            kind: RuleKind::Flag,
            description: "Flag placeholder references such as TEST or DUMMY",
            config: FlagConfig {
                column: "reference".to_string(),
                operator: FlagOperator::Regex,
                threshold: Value::from("(?i)^(test|dummy|xxx+)"),
                reason: "Suspicious reference".to_string(),
            }
            .into(),
        },
        RuleTemplate {
            name: "outlier_detection",
            kind: RuleKind::Flag,
            description: "Flag amounts outside the interquartile fences",
            config: FlagConfig {
                column: "amount".to_string(),
                operator: FlagOperator::Outlier,
                threshold: Value::from("iqr"),
                reason: "Statistical outlier".to_string(),
            }
            .into(),
        },
    ]
}

/// Templates of one kind, in declaration order.
pub fn templates(kind: RuleKind) -> Vec<&'static RuleTemplate> {
    TEMPLATES.iter().filter(|t| t.kind == kind).collect()
}

pub fn template(kind: RuleKind, name: &str) -> Result<&'static RuleTemplate> {
    TEMPLATES
        .iter()
        .find(|t| t.kind == kind && t.name == name)
        .ok_or_else(|| EngineError::NotFound(format!("{kind} template '{name}'")))
}

/// Clone a template's config into a new rule called `new_name`.
pub fn instantiate(kind: RuleKind, template_name: &str, new_name: &str) -> Result<Rule> {
    let template = template(kind, template_name)?;
    if new_name.trim().is_empty() {
        return Err(EngineError::validation(
            "rule name may not be empty",
            &template.config,
        ));
    }
    Ok(Rule::new(new_name, template.config.clone()))
}
