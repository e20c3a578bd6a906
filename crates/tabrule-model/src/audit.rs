//! Audit trail records and caller identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File id used for audit entries that concern the rule registry itself.
pub const RULE_ENGINE_FILE_ID: &str = "rule_engine";

/// Identity supplied by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub caller_id: String,
    pub role: String,
}

impl Caller {
    pub fn new(caller_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            role: role.into(),
        }
    }

    /// Identity used for work started by the engine itself.
    pub fn system() -> Self {
        Self::new("system", "system")
    }
}

/// Operation recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    /// Request-level failures before the pipeline starts.
    Apply,
    InferSchema,
    Normalize,
    Clean,
    Aggregate,
    Flag,
    Assemble,
    Export,
    CreateRule,
    DeleteRule,
    ImportRules,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::InferSchema => "infer_schema",
            Self::Normalize => "normalize",
            Self::Clean => "clean",
            Self::Aggregate => "aggregate",
            Self::Flag => "flag",
            Self::Assemble => "assemble",
            Self::Export => "export",
            Self::CreateRule => "create_rule",
            Self::DeleteRule => "delete_rule",
            Self::ImportRules => "import_rules",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number within the log.
    pub id: u64,
    pub file_id: String,
    pub caller: Caller,
    pub operation: AuditOperation,
    pub status: AuditStatus,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}
