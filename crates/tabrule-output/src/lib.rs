//! Export adapters.
//!
//! - **delimited**: execution results as CSV or other delimited text
//! - **rules**: rule documents as JSON

mod delimited;
mod error;
mod rules;

pub use delimited::{
    DelimitedOptions, write_result_csv, write_result_csv_file, write_result_delimited,
};
pub use error::{ExportError, Result};
pub use rules::{
    read_rule_document, read_rule_document_file, rules_to_json_string, write_rule_document,
    write_rule_document_file,
};
