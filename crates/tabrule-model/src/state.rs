use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one file through an apply request.
///
/// States advance strictly in declaration order; `Failed` can be entered
/// from any state other than `Exported`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    #[default]
    Uploaded,
    SchemaInferred,
    Normalized,
    Cleaned,
    Aggregated,
    Flagged,
    Exported,
    Failed,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::SchemaInferred => "schema_inferred",
            Self::Normalized => "normalized",
            Self::Cleaned => "cleaned",
            Self::Aggregated => "aggregated",
            Self::Flagged => "flagged",
            Self::Exported => "exported",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exported | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: ExecutionState) -> bool {
        match next {
            Self::Failed => !self.is_terminal(),
            _ => !self.is_terminal() && next > *self,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_reachable_from_non_terminal_only() {
        assert!(ExecutionState::Normalized.can_advance_to(ExecutionState::Failed));
        assert!(!ExecutionState::Exported.can_advance_to(ExecutionState::Failed));
        assert!(!ExecutionState::Failed.can_advance_to(ExecutionState::Failed));
    }

    #[test]
    fn steps_may_be_skipped_but_not_reversed() {
        assert!(ExecutionState::SchemaInferred.can_advance_to(ExecutionState::Aggregated));
        assert!(!ExecutionState::Flagged.can_advance_to(ExecutionState::Cleaned));
    }
}
