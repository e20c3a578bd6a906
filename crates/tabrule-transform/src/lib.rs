//! Dataset transforms for the rule engine.
//!
//! - **inference**: column type and statistics inference
//! - **normalization**: date, currency and code normalization rules
//! - **cleaning**: missing-value and IQR outlier policies
//! - **flag**: predicate rules that mark rows
//! - **stats**: descriptive statistics shared with aggregation

pub mod cleaning;
pub mod flag;
pub mod inference;
pub mod normalization;
pub mod stats;

pub use cleaning::{CleaningPipeline, CleaningReport};
pub use flag::{FLAG_REASON_COLUMN, FLAGGED_COLUMN, FlagPredicate, apply_flag};
pub use inference::{InferenceSettings, infer_schema};
pub use normalization::{DateOrder, NormalizationEngine};
