//! Dataset ingestion adapters.
//!
//! - **CSV**: read delimited files into [`Dataset`](tabrule_model::Dataset)s
//! - **DataFrame bridge**: convert Polars frames produced elsewhere

mod error;
mod frame;
mod reader;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV Reading ===
pub use reader::{parse_cell, read_csv_dataset, read_csv_from_reader};

// === DataFrame Bridge ===
pub use frame::{any_to_value, dataset_from_frame};
