//! Named rules and read-only templates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::aggregation::AggregationConfig;
use crate::error::{EngineError, Result};
use crate::flag::FlagConfig;
use crate::normalization::NormalizationConfig;

/// The three rule families. Names are unique within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Normalization,
    Aggregation,
    Flag,
}

impl RuleKind {
    pub const ALL: [RuleKind; 3] = [RuleKind::Normalization, RuleKind::Aggregation, RuleKind::Flag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalization => "normalization",
            Self::Aggregation => "aggregation",
            Self::Flag => "flag",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown rule type '{s}'"))
    }
}

/// Typed rule configuration. The variant always matches the rule's kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleConfig {
    Normalization(NormalizationConfig),
    Aggregation(AggregationConfig),
    Flag(FlagConfig),
}

impl RuleConfig {
    /// Parse and validate a raw config against a declared kind.
    ///
    /// Shape errors and structural errors both surface as
    /// [`EngineError::Validation`] echoing `raw`.
    pub fn parse(kind: RuleKind, raw: &serde_json::Value) -> Result<Self> {
        let config = match kind {
            RuleKind::Normalization => Self::Normalization(decode(raw)?),
            RuleKind::Aggregation => Self::Aggregation(decode(raw)?),
            RuleKind::Flag => Self::Flag(decode(raw)?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Normalization(_) => RuleKind::Normalization,
            Self::Aggregation(_) => RuleKind::Aggregation,
            Self::Flag(_) => RuleKind::Flag,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Normalization(config) => config.validate(),
            Self::Aggregation(config) => config.validate(),
            Self::Flag(config) => config.validate(),
        }
    }

    /// JSON form used in rule documents.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn decode<T: DeserializeOwned>(raw: &serde_json::Value) -> Result<T> {
    T::deserialize(raw).map_err(|e| EngineError::Validation {
        message: e.to_string(),
        config: raw.clone(),
    })
}

impl From<NormalizationConfig> for RuleConfig {
    fn from(config: NormalizationConfig) -> Self {
        Self::Normalization(config)
    }
}

impl From<AggregationConfig> for RuleConfig {
    fn from(config: AggregationConfig) -> Self {
        Self::Aggregation(config)
    }
}

impl From<FlagConfig> for RuleConfig {
    fn from(config: FlagConfig) -> Self {
        Self::Flag(config)
    }
}

/// A named rule held by the rule store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    pub config: RuleConfig,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(name: impl Into<String>, config: RuleConfig) -> Self {
        Self {
            name: name.into(),
            kind: config.kind(),
            config,
            created_at: Utc::now(),
        }
    }
}

/// Pre-seeded rule configuration. Never mutated; cloned on instantiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTemplate {
    pub name: &'static str,
    pub kind: RuleKind,
    pub description: &'static str,
    pub config: RuleConfig,
}

/// Portable form of the rule registry: `{kind: {name: config}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    #[serde(default)]
    pub normalization: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub aggregation: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub flag: BTreeMap<String, serde_json::Value>,
}

impl RuleDocument {
    pub fn section(&self, kind: RuleKind) -> &BTreeMap<String, serde_json::Value> {
        match kind {
            RuleKind::Normalization => &self.normalization,
            RuleKind::Aggregation => &self.aggregation,
            RuleKind::Flag => &self.flag,
        }
    }

    pub fn section_mut(&mut self, kind: RuleKind) -> &mut BTreeMap<String, serde_json::Value> {
        match kind {
            RuleKind::Normalization => &mut self.normalization,
            RuleKind::Aggregation => &mut self.aggregation,
            RuleKind::Flag => &mut self.flag,
        }
    }

    /// Every `(kind, name, raw config)` in kind order, then name order.
    pub fn entries(&self) -> impl Iterator<Item = (RuleKind, &str, &serde_json::Value)> {
        RuleKind::ALL.into_iter().flat_map(move |kind| {
            self.section(kind)
                .iter()
                .map(move |(name, config)| (kind, name.as_str(), config))
        })
    }

    pub fn len(&self) -> usize {
        self.normalization.len() + self.aggregation.len() + self.flag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::TransformKind;

    #[test]
    fn parse_checks_kind_shape() {
        let raw = serde_json::json!({"columns": {"Type": {"kind": "cr_dr_mapping"}}});
        let config = RuleConfig::parse(RuleKind::Normalization, &raw).unwrap();
        assert_eq!(
            config,
            RuleConfig::Normalization(NormalizationConfig::single(
                "Type",
                TransformKind::CrDrMapping
            ))
        );

        let err = RuleConfig::parse(RuleKind::Flag, &raw).unwrap_err();
        let EngineError::Validation { config, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(config, raw);
    }

    #[test]
    fn to_json_parses_back() {
        let raw = serde_json::json!({
            "column": "Amount",
            "operator": "gt",
            "threshold": 5000.0,
            "reason": "High value"
        });
        let config = RuleConfig::parse(RuleKind::Flag, &raw).unwrap();
        assert_eq!(config.to_json(), raw);
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("Aggregation".parse::<RuleKind>(), Ok(RuleKind::Aggregation));
        assert!("cleaning".parse::<RuleKind>().is_err());
    }
}
