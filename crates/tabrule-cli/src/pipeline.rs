//! Glue between the command line and the rule engine.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tabrule_core::{EngineConfig, InMemoryStorage, RuleEngine, RuleSelection, RuleStore};
use tabrule_model::{Caller, DatasetSchema, ExecutionResult, RuleKind};
use tabrule_transform::infer_schema;
use tracing::{debug, info, trace};

use crate::logging::redact_value;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Rule counts of a validated rule document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleCheck {
    pub normalization: usize,
    pub aggregation: usize,
    pub flag: usize,
}

impl RuleCheck {
    pub fn total(&self) -> usize {
        self.normalization + self.aggregation + self.flag
    }
}

/// Identity recorded in the audit log for CLI requests.
pub fn cli_caller() -> Caller {
    let user = std::env::var("USER")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "cli".to_string());
    Caller::new(user, "operator")
}

/// File id used for a CSV input: its file stem.
pub fn file_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "input".to_string())
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_or_default(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Read a CSV file and infer its schema.
pub fn infer_file_schema(path: &Path, config: &EngineConfig) -> Result<DatasetSchema> {
    let dataset = tabrule_ingest::read_csv_dataset(path)
        .with_context(|| format!("read {}", path.display()))?;
    let schema = infer_schema(&dataset, &config.inference_settings())
        .with_context(|| format!("infer schema of {}", path.display()))?;
    for column in &schema.columns {
        for value in &column.sample_stats.sample_values {
            trace!(column = %column.name, value = redact_value(&value.render()), "sample value");
        }
    }
    info!(
        columns = schema.columns.len(),
        rows = dataset.height(),
        "schema inferred"
    );
    Ok(schema)
}

/// Validate a rule document with import semantics against an empty store.
pub fn check_rule_document(path: &Path) -> Result<RuleCheck> {
    let document = tabrule_output::read_rule_document_file(path)
        .with_context(|| format!("read rule document {}", path.display()))?;
    let store = RuleStore::new();
    store
        .import(&document)
        .with_context(|| format!("check rule document {}", path.display()))?;
    Ok(RuleCheck {
        normalization: store.list(RuleKind::Normalization)?.len(),
        aggregation: store.list(RuleKind::Aggregation)?.len(),
        flag: store.list(RuleKind::Flag)?.len(),
    })
}

/// Build the rule selection from command-line names.
pub fn build_selection(
    normalization: &[String],
    aggregation: Option<&str>,
    flag: &[String],
) -> RuleSelection {
    let mut selection = RuleSelection::new();
    for name in normalization.iter().filter(|name| !name.trim().is_empty()) {
        selection = selection.normalize(name.trim());
    }
    if let Some(name) = aggregation.filter(|name| !name.trim().is_empty()) {
        selection = selection.aggregate(name.trim());
    }
    for name in flag.iter().filter(|name| !name.trim().is_empty()) {
        selection = selection.flag(name.trim());
    }
    selection
}

/// An engine holding one CSV file and the rules of one rule document.
pub struct Session {
    pub engine: RuleEngine,
    pub file_id: String,
    pub caller: Caller,
}

impl Session {
    pub fn open(config: &EngineConfig, input: &Path, rules: &Path, caller: Caller) -> Result<Self> {
        let dataset = tabrule_ingest::read_csv_dataset(input)
            .with_context(|| format!("read {}", input.display()))?;
        let file_id = file_id_for(input);
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert(file_id.clone(), dataset)?;
        let engine = RuleEngine::new(config, storage);

        let document = tabrule_output::read_rule_document_file(rules)
            .with_context(|| format!("read rule document {}", rules.display()))?;
        let imported = engine
            .import_rules(&document, &caller)
            .with_context(|| format!("import rules from {}", rules.display()))?;
        debug!(imported, file_id, "session ready");
        Ok(Self {
            engine,
            file_id,
            caller,
        })
    }

    /// Run one execution on the worker pool, reporting progress while it
    /// runs.
    pub fn run(
        &self,
        selection: RuleSelection,
        mut on_progress: impl FnMut(u8),
    ) -> Result<ExecutionResult> {
        let handle = self
            .engine
            .submit(self.file_id.clone(), selection, self.caller.clone())?;
        let result = loop {
            on_progress(handle.progress());
            if let Some(result) = handle.wait_timeout(POLL_INTERVAL) {
                break result;
            }
        };
        on_progress(handle.progress());
        Ok(result?)
    }

    /// Write a result as CSV to `path`.
    pub fn export(&self, result: &ExecutionResult, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        self.engine
            .export_csv(&self.file_id, result, BufWriter::new(file), &self.caller)
            .with_context(|| format!("write {}", path.display()))
    }

    pub fn close(self) {
        self.engine.shutdown();
    }
}
