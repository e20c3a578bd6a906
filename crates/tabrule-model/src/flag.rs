//! Flag rule configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::value::Value;

/// Comparison applied between a cell and the rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagOperator {
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    #[serde(alias = "==")]
    Eq,
    Contains,
    Regex,
    /// Column-level outlier test; the threshold names an [`OutlierMethod`].
    Outlier,
}

/// Outlier detection method for [`FlagOperator::Outlier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutlierMethod {
    /// Outside the Tukey fences `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
    #[default]
    Iqr,
    /// More than three sample standard deviations from the mean.
    Zscore,
}

impl OutlierMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "iqr" => Some(Self::Iqr),
            "zscore" | "z_score" => Some(Self::Zscore),
            _ => None,
        }
    }
}

impl FlagOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::Outlier => "outlier",
        }
    }

    /// Whether the threshold must be a number.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

/// Predicate that marks matching rows with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagConfig {
    pub column: String,
    pub operator: FlagOperator,
    #[serde(default)]
    pub threshold: Value,
    pub reason: String,
}

impl FlagConfig {
    /// Shape checks. Regex syntax is checked when the predicate is compiled.
    pub fn validate(&self) -> Result<()> {
        if self.column.trim().is_empty() {
            return Err(EngineError::validation("flag rule requires a column", self));
        }
        if self.operator.is_ordering() && self.threshold.as_f64().is_none() {
            return Err(EngineError::validation(
                format!(
                    "operator '{}' requires a numeric threshold",
                    self.operator.as_str()
                ),
                self,
            ));
        }
        if matches!(self.operator, FlagOperator::Contains | FlagOperator::Regex)
            && self.threshold.as_str().is_none()
        {
            return Err(EngineError::validation(
                format!(
                    "operator '{}' requires a text threshold",
                    self.operator.as_str()
                ),
                self,
            ));
        }
        if self.operator == FlagOperator::Outlier {
            self.outlier_method()?;
        }
        Ok(())
    }

    /// Method of an outlier rule; a null threshold means IQR.
    pub fn outlier_method(&self) -> Result<OutlierMethod> {
        match &self.threshold {
            Value::Null => Ok(OutlierMethod::default()),
            Value::Text(name) => OutlierMethod::parse(name).ok_or_else(|| {
                EngineError::validation(
                    format!("unknown outlier method '{name}', expected 'iqr' or 'zscore'"),
                    self,
                )
            }),
            other => Err(EngineError::validation(
                format!("outlier method must be text, got '{}'", other.render()),
                self,
            )),
        }
    }
}
