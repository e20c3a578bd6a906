//! Aggregation rule configuration.
//!
//! [`AggregationConfig`] is a closed tagged union: one variant per
//! aggregation kind, each with its own field set. Unknown fields and unknown
//! function names are rejected when the config is parsed, not when it runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cleaning::CleaningRules;
use crate::error::{EngineError, Result};

/// Aggregation function applied to one value column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFn {
    #[default]
    Sum,
    #[serde(alias = "average")]
    Mean,
    Median,
    Min,
    Max,
    Count,
    Std,
    Var,
    First,
    Last,
    UniqueCount,
}

impl AggFn {
    pub const ALL: [AggFn; 11] = [
        AggFn::Sum,
        AggFn::Mean,
        AggFn::Median,
        AggFn::Min,
        AggFn::Max,
        AggFn::Count,
        AggFn::Std,
        AggFn::Var,
        AggFn::First,
        AggFn::Last,
        AggFn::UniqueCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Std => "std",
            Self::Var => "var",
            Self::First => "first",
            Self::Last => "last",
            Self::UniqueCount => "unique_count",
        }
    }

    /// Whether the function requires a numeric column.
    ///
    /// `count`, `first`, `last` and `unique_count` accept any type.
    pub fn requires_numeric(&self) -> bool {
        !matches!(
            self,
            Self::Count | Self::First | Self::Last | Self::UniqueCount
        )
    }
}

impl fmt::Display for AggFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "average" {
            return Ok(Self::Mean);
        }
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| format!("unsupported aggregation function '{s}'"))
    }
}

/// Calendar bucket size for time-series aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "D", alias = "d")]
    Day,
    #[serde(rename = "W", alias = "w")]
    Week,
    #[serde(rename = "M", alias = "m")]
    Month,
    #[serde(rename = "Q", alias = "q")]
    Quarter,
    #[serde(rename = "Y", alias = "y")]
    Year,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "D",
            Self::Week => "W",
            Self::Month => "M",
            Self::Quarter => "Q",
            Self::Year => "Y",
        }
    }
}

/// Built-in composite aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternName {
    TransactionSummary,
    CustomerSummary,
    RegionalSummary,
}

impl PatternName {
    pub const ALL: [PatternName; 3] = [
        PatternName::TransactionSummary,
        PatternName::CustomerSummary,
        PatternName::RegionalSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionSummary => "transaction_summary",
            Self::CustomerSummary => "customer_summary",
            Self::RegionalSummary => "regional_summary",
        }
    }
}

impl FromStr for PatternName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| format!("unknown pattern name '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupByConfig {
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_columns: Vec<String>,
    #[serde(default)]
    pub aggregations: BTreeMap<String, Vec<AggFn>>,
    #[serde(default, skip_serializing_if = "CleaningRules::is_noop")]
    pub cleaning_rules: CleaningRules,
}

impl GroupByConfig {
    /// Value columns with their functions, in output order.
    ///
    /// Listed `value_columns` come first (defaulting to `sum` when they have
    /// no entry in `aggregations`), then remaining `aggregations` keys.
    pub fn resolved_aggregations(&self) -> Vec<(&str, Vec<AggFn>)> {
        let mut resolved: Vec<(&str, Vec<AggFn>)> = self
            .value_columns
            .iter()
            .map(|column| {
                let fns = self
                    .aggregations
                    .get(column)
                    .cloned()
                    .unwrap_or_else(|| vec![AggFn::Sum]);
                (column.as_str(), fns)
            })
            .collect();
        for (column, fns) in &self.aggregations {
            if !self.value_columns.contains(column) {
                resolved.push((column.as_str(), fns.clone()));
            }
        }
        resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSeriesConfig {
    pub date_column: String,
    pub value_column: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, alias = "aggregation")]
    pub agg_fn: AggFn,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "CleaningRules::is_noop")]
    pub cleaning_rules: CleaningRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PivotConfig {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<String>,
    #[serde(default, alias = "aggfunc")]
    pub agg_fn: AggFn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<f64>,
    #[serde(default, skip_serializing_if = "CleaningRules::is_noop")]
    pub cleaning_rules: CleaningRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryStatsConfig {
    /// Empty means every numeric column.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub include_financial_metrics: bool,
    #[serde(default, skip_serializing_if = "CleaningRules::is_noop")]
    pub cleaning_rules: CleaningRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    pub name: PatternName,
    #[serde(default, skip_serializing_if = "CleaningRules::is_noop")]
    pub cleaning_rules: CleaningRules,
}

/// One aggregation rule. Exactly one kind per rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationConfig {
    GroupBy(GroupByConfig),
    TimeSeries(TimeSeriesConfig),
    Pivot(PivotConfig),
    SummaryStats(SummaryStatsConfig),
    Pattern(PatternConfig),
}

impl AggregationConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::GroupBy(_) => "group_by",
            Self::TimeSeries(_) => "time_series",
            Self::Pivot(_) => "pivot",
            Self::SummaryStats(_) => "summary_stats",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Cleaning rules embedded in this config.
    pub fn cleaning_rules(&self) -> &CleaningRules {
        match self {
            Self::GroupBy(c) => &c.cleaning_rules,
            Self::TimeSeries(c) => &c.cleaning_rules,
            Self::Pivot(c) => &c.cleaning_rules,
            Self::SummaryStats(c) => &c.cleaning_rules,
            Self::Pattern(c) => &c.cleaning_rules,
        }
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(EngineError::validation(message, self));
        match self {
            Self::GroupBy(c) => {
                if c.group_by.is_empty() {
                    return fail("group_by requires at least one column");
                }
                if c.resolved_aggregations().is_empty() {
                    return fail("group_by requires value_columns or aggregations");
                }
                if c.aggregations.values().any(Vec::is_empty) {
                    return fail("aggregation function list may not be empty");
                }
            }
            Self::TimeSeries(c) => {
                if c.date_column.trim().is_empty() || c.value_column.trim().is_empty() {
                    return fail("time_series requires date_column and value_column");
                }
            }
            Self::Pivot(c) => {
                if c.index.is_empty() {
                    return fail("pivot requires at least one index column");
                }
                if c.columns.len() != 1 {
                    return fail("pivot requires exactly one columns entry");
                }
                if c.values.is_empty() {
                    return fail("pivot requires at least one values column");
                }
            }
            Self::SummaryStats(_) | Self::Pattern(_) => {}
        }
        Ok(())
    }
}
