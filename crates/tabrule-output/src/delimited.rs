//! Delimited-text export of execution results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tabrule_model::{Dataset, ExecutionResult};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Field delimiter and null rendering for exported tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    /// Text written for null cells.
    pub null_text: String,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_text: String::new(),
        }
    }
}

/// Write `result` as CSV: a header of `result.columns`, then one record per
/// row in result column order.
pub fn write_result_csv<W: Write>(result: &ExecutionResult, writer: W) -> Result<()> {
    write_result_delimited(result, writer, &DelimitedOptions::default())
}

pub fn write_result_delimited<W: Write>(
    result: &ExecutionResult,
    writer: W,
    options: &DelimitedOptions,
) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);
    out.write_record(&result.columns)?;
    for row in &result.rows {
        out.write_record(result.columns.iter().map(|column| {
            let value = Dataset::cell(row, column);
            if value.is_null() {
                options.null_text.clone()
            } else {
                value.render()
            }
        }))?;
    }
    out.flush()?;
    debug!(
        rows = result.total_rows,
        columns = result.total_columns,
        "wrote delimited result"
    );
    Ok(())
}

/// Write `result` as CSV to `path`, creating or truncating the file.
pub fn write_result_csv_file(result: &ExecutionResult, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| ExportError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    write_result_csv(result, BufWriter::new(file))
}
