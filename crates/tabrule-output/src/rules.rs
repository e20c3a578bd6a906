//! Rule document files.
//!
//! A rule document is JSON of the form
//! `{"normalization": {name: config}, "aggregation": {...}, "flag": {...}}`.
//! Reading only checks the document shape; rule configs are validated
//! when the document is imported.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tabrule_model::RuleDocument;

use crate::error::{ExportError, Result};

pub fn rules_to_json_string(document: &RuleDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn write_rule_document<W: Write>(document: &RuleDocument, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_rule_document_file(document: &RuleDocument, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| ExportError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    write_rule_document(document, BufWriter::new(file))
}

pub fn read_rule_document<R: Read>(reader: R) -> Result<RuleDocument> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_rule_document_file(path: &Path) -> Result<RuleDocument> {
    let file = File::open(path).map_err(|source| ExportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_rule_document(BufReader::new(file))
}
