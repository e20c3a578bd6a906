use serde::Serialize;
use thiserror::Error;

/// Errors raised by the rule engine.
///
/// Value-level normalization failures are not errors: they surface as
/// [`crate::Warning`]s and execution continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The dataset cannot be described (e.g. it has no columns).
    #[error("schema error: {0}")]
    Schema(String),

    /// A rule or request references something that does not exist or is
    /// not supported. Raised before any mutation; carries the config.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        config: serde_json::Value,
    },

    #[error("not found: {0}")]
    NotFound(String),

    /// A transform was applied to a column of the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// One rule in an import document is invalid; nothing was imported.
    #[error("import rejected at rule '{rule}': {message}")]
    Import { rule: String, message: String },

    /// The storage collaborator failed, or shared state is unusable.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Build a validation error echoing the offending config.
    pub fn validation(message: impl Into<String>, config: &impl Serialize) -> Self {
        Self::Validation {
            message: message.into(),
            config: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Short label used in audit details.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "SchemaError",
            Self::Validation { .. } => "ValidationError",
            Self::NotFound(_) => "NotFoundError",
            Self::Type(_) => "TypeError",
            Self::Import { .. } => "ImportError",
            Self::Storage(_) => "StorageError",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
