//! Aggregation engine.
//!
//! [`AggregationEngine::aggregate`] dispatches exhaustively over
//! [`AggregationConfig`]:
//!
//! - **group_by**: partition by key tuple, `{column}_{function}` outputs
//! - **time_series**: calendar buckets (D/W/M/Q/Y), ascending, no gap fill
//! - **pivot**: index rows by distinct column keys
//! - **summary_stats**: one row of statistics per numeric column
//! - **pattern**: fixed group-by shapes for common transaction reports
//!
//! Every referenced column is checked before any work is done.

pub mod columns;
pub mod functions;
mod group_by;
pub mod pattern;
mod pivot;
mod summary;
pub mod time_series;

pub use columns::{ReferencedColumns, numeric_columns, referenced_columns};
pub use pattern::pattern_group_by;

use tabrule_model::{AggregationConfig, Dataset, Result, Warning};
use tabrule_transform::DateOrder;
use tracing::debug;

/// Aggregated table plus non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub table: Dataset,
    pub warnings: Vec<Warning>,
}

/// Runs aggregation configs against datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine {
    date_order: DateOrder,
}

impl AggregationEngine {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    /// Aggregate `dataset` according to `config`.
    ///
    /// Fails with a validation error, before computing anything, when a
    /// referenced column is missing or a numeric function targets a
    /// non-numeric column.
    pub fn aggregate(&self, dataset: &Dataset, config: &AggregationConfig) -> Result<Aggregated> {
        config.validate()?;
        let referenced = referenced_columns(config, dataset);
        columns::validate_references(config, dataset, &referenced)?;

        let aggregated = match config {
            AggregationConfig::GroupBy(c) => Aggregated {
                table: group_by::group_by(dataset, &c.group_by, &referenced.values),
                warnings: Vec::new(),
            },
            AggregationConfig::Pattern(_) => Aggregated {
                table: group_by::group_by(dataset, &referenced.keys, &referenced.values),
                warnings: Vec::new(),
            },
            AggregationConfig::TimeSeries(c) => {
                let (table, warnings) = time_series::time_series(dataset, c, self.date_order);
                Aggregated { table, warnings }
            }
            AggregationConfig::Pivot(c) => Aggregated {
                table: pivot::pivot(dataset, c)?,
                warnings: Vec::new(),
            },
            AggregationConfig::SummaryStats(c) => {
                let columns: Vec<String> = referenced
                    .values
                    .iter()
                    .map(|(column, _)| column.clone())
                    .collect();
                Aggregated {
                    table: summary::summary_stats(dataset, &columns, c.include_financial_metrics),
                    warnings: Vec::new(),
                }
            }
        };
        debug!(
            kind = config.kind_name(),
            input_rows = dataset.height(),
            output_rows = aggregated.table.height(),
            output_columns = aggregated.table.width(),
            "aggregated dataset"
        );
        Ok(aggregated)
    }
}
