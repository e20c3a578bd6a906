pub mod aggregation;
pub mod audit;
pub mod cleaning;
pub mod dataset;
pub mod error;
pub mod flag;
pub mod normalization;
pub mod result;
pub mod rule;
pub mod schema;
pub mod state;
pub mod value;

pub use aggregation::{
    AggFn, AggregationConfig, Frequency, GroupByConfig, PatternConfig, PatternName, PivotConfig,
    SummaryStatsConfig, TimeSeriesConfig,
};
pub use audit::{AuditEntry, AuditOperation, AuditStatus, Caller, RULE_ENGINE_FILE_ID};
pub use cleaning::{CleaningRules, MissingValuePolicy, OutlierPolicy};
pub use dataset::{Dataset, Row};
pub use error::{EngineError, Result};
pub use flag::{FlagConfig, FlagOperator, OutlierMethod};
pub use normalization::{NormalizationConfig, TransformKind};
pub use result::{ExecutionResult, Warning};
pub use rule::{Rule, RuleConfig, RuleDocument, RuleKind, RuleTemplate};
pub use schema::{ColumnSchema, ColumnType, DataQuality, DatasetSchema, SampleStats, SparseColumn};
pub use state::ExecutionState;
pub use value::{Value, ValueKey, format_numeric, parse_f64};
