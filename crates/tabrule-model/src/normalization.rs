//! Normalization rule configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Column-level value transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TransformKind {
    /// Parse with the known date formats and emit `YYYY-MM-DD`.
    #[serde(rename = "date_iso8601")]
    DateIso8601,
    /// Remove currency symbols and thousands separators, parse a number.
    StripCurrency,
    /// `CR` -> `Credit`, `DR` -> `Debit`, case-insensitive.
    CrDrMapping,
    /// Keep only ASCII alphanumerics, uppercased.
    AccountStandardize,
    /// Explicit lookup table; unmapped values pass through.
    CustomMapping { mapping: BTreeMap<String, String> },
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateIso8601 => "date_iso8601",
            Self::StripCurrency => "strip_currency",
            Self::CrDrMapping => "cr_dr_mapping",
            Self::AccountStandardize => "account_standardize",
            Self::CustomMapping { .. } => "custom_mapping",
        }
    }
}

/// A normalization rule: source column -> transform, then column renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizationConfig {
    #[serde(default)]
    pub columns: BTreeMap<String, TransformKind>,
    /// Old name -> new name, applied after the transforms.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rename: BTreeMap<String, String>,
}

impl NormalizationConfig {
    /// Single-column convenience constructor.
    pub fn single(column: impl Into<String>, transform: TransformKind) -> Self {
        Self {
            columns: BTreeMap::from([(column.into(), transform)]),
            rename: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() && self.rename.is_empty() {
            return Err(EngineError::validation(
                "normalization rule maps no columns",
                self,
            ));
        }
        if self.rename.values().any(|target| target.trim().is_empty()) {
            return Err(EngineError::validation(
                "rename target may not be empty",
                self,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_only_rule_is_valid() {
        let config: NormalizationConfig =
            serde_json::from_str(r#"{"rename": {"Acct No": "account"}}"#).unwrap();
        assert!(config.columns.is_empty());
        config.validate().unwrap();

        let blank: NormalizationConfig =
            serde_json::from_str(r#"{"rename": {"Acct No": " "}}"#).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn renames_are_omitted_when_empty() {
        let config = NormalizationConfig::single("Type", TransformKind::CrDrMapping);
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"columns":{"Type":{"kind":"cr_dr_mapping"}}}"#
        );
    }
}
