//! Rule engine core.
//!
//! - **store**: process-wide registry of named rules with all-or-nothing import
//! - **templates**: read-only built-in rule templates
//! - **audit**: append-only audit log
//! - **storage**: dataset storage collaborator trait
//! - **executor**: the infer / normalize / clean / aggregate / flag pipeline
//! - **pool**: bounded worker pool, one task at a time per file
//! - **engine**: [`RuleEngine`] facade over all of the above
//! - **config**: [`EngineConfig`] loaded from TOML

pub mod audit;
pub mod config;
pub mod engine;
pub mod executor;
pub mod pool;
pub mod storage;
pub mod store;
pub mod templates;

pub use audit::AuditLog;
pub use config::{ConfigError, EngineConfig};
pub use engine::RuleEngine;
pub use executor::{
    Engines, ExecutionContext, ExecutionPipeline, ExecutionStates, ExecutionStep,
    ResolvedRules, RuleExecutor, RuleSelection,
};
pub use pool::{TaskHandle, WorkerPool};
pub use storage::{DatasetStorage, InMemoryStorage};
pub use store::{RuleStore, parse_rule_config};
