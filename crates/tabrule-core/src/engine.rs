//! Rule engine facade.
//!
//! [`RuleEngine`] wires the rule store, the dataset storage collaborator,
//! the audit log and the worker pool together and exposes the operations
//! offered to callers. Rule-management calls are audited under
//! [`RULE_ENGINE_FILE_ID`].

use std::io::Write;
use std::sync::Arc;

use tabrule_model::{
    AuditOperation, Caller, EngineError, ExecutionResult, ExecutionState, RULE_ENGINE_FILE_ID,
    Result, Rule, RuleDocument, RuleKind, RuleTemplate,
};
use tracing::info;

use crate::audit::AuditLog;
use crate::config::EngineConfig;
use crate::executor::{Engines, ExecutionStates, RuleExecutor, RuleSelection};
use crate::pool::{TaskHandle, WorkerPool};
use crate::storage::DatasetStorage;
use crate::store::RuleStore;
use crate::templates;

pub struct RuleEngine {
    store: Arc<RuleStore>,
    audit: AuditLog,
    states: Arc<ExecutionStates>,
    pool: WorkerPool,
}

impl RuleEngine {
    /// Engine with a fresh, empty rule store.
    pub fn new(config: &EngineConfig, storage: Arc<dyn DatasetStorage>) -> Self {
        Self::with_store(config, storage, Arc::new(RuleStore::new()))
    }

    /// Engine over an existing rule store.
    pub fn with_store(
        config: &EngineConfig,
        storage: Arc<dyn DatasetStorage>,
        store: Arc<RuleStore>,
    ) -> Self {
        let audit = AuditLog::new();
        let states = Arc::new(ExecutionStates::default());
        let executor = Arc::new(RuleExecutor::new(
            Arc::clone(&store),
            storage,
            audit.clone(),
            Arc::clone(&states),
            Engines::from_config(config),
        ));
        let pool = WorkerPool::new(
            executor,
            config.workers,
            config.queue_capacity,
        );
        info!(workers = pool.size(), "rule engine started");
        Self {
            store,
            audit,
            states,
            pool,
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Create or replace a rule.
    pub fn create_rule(
        &self,
        kind: RuleKind,
        name: &str,
        config: &serde_json::Value,
        caller: &Caller,
    ) -> Result<Arc<Rule>> {
        self.audited(caller, AuditOperation::CreateRule, || {
            let rule = self.store.create(kind, name, config)?;
            Ok((rule, format!("created {kind} rule '{name}'")))
        })
    }

    pub fn get_rule(&self, kind: RuleKind, name: &str) -> Result<Arc<Rule>> {
        self.store.get(kind, name)
    }

    pub fn delete_rule(&self, kind: RuleKind, name: &str, caller: &Caller) -> Result<()> {
        self.audited(caller, AuditOperation::DeleteRule, || {
            self.store.delete(kind, name)?;
            Ok(((), format!("deleted {kind} rule '{name}'")))
        })
    }

    pub fn list_rules(&self, kind: RuleKind) -> Result<Vec<Arc<Rule>>> {
        self.store.list(kind)
    }

    pub fn list_templates(&self, kind: RuleKind) -> Vec<&'static RuleTemplate> {
        templates::templates(kind)
    }

    /// Store a copy of a template's config as a new rule.
    pub fn instantiate_template(
        &self,
        kind: RuleKind,
        template: &str,
        new_name: &str,
        caller: &Caller,
    ) -> Result<Arc<Rule>> {
        self.audited(caller, AuditOperation::CreateRule, || {
            let rule = self.store.put(templates::instantiate(kind, template, new_name)?)?;
            Ok((
                rule,
                format!("created {kind} rule '{new_name}' from template '{template}'"),
            ))
        })
    }

    pub fn export_rules(&self) -> Result<RuleDocument> {
        self.store.export()
    }

    /// All-or-nothing import; see [`RuleStore::import`].
    pub fn import_rules(&self, document: &RuleDocument, caller: &Caller) -> Result<usize> {
        self.audited(caller, AuditOperation::ImportRules, || {
            let count = self.store.import(document)?;
            Ok((count, format!("imported {count} rules")))
        })
    }

    /// Run an apply request and block until it finishes.
    ///
    /// The request goes through the worker pool like [`submit`](Self::submit),
    /// so it queues behind any in-flight task for the same file.
    pub fn apply(
        &self,
        file_id: &str,
        selection: &RuleSelection,
        caller: &Caller,
    ) -> Result<ExecutionResult> {
        self.pool
            .submit(file_id, selection.clone(), caller.clone())?
            .wait()
    }

    /// Queue an apply request on the worker pool.
    pub fn submit(
        &self,
        file_id: impl Into<String>,
        selection: RuleSelection,
        caller: Caller,
    ) -> Result<TaskHandle> {
        self.pool.submit(file_id, selection, caller)
    }

    /// Last known execution state of a file.
    pub fn state(&self, file_id: &str) -> Option<ExecutionState> {
        self.states.get(file_id)
    }

    /// Write a result as CSV and mark the file exported.
    pub fn export_csv<W: Write>(
        &self,
        file_id: &str,
        result: &ExecutionResult,
        writer: W,
        caller: &Caller,
    ) -> Result<()> {
        match tabrule_output::write_result_csv(result, writer) {
            Ok(()) => {
                self.audit.success(
                    file_id,
                    caller,
                    AuditOperation::Export,
                    format!("exported {} rows as csv", result.total_rows),
                );
                self.states.advance(file_id, ExecutionState::Exported);
                Ok(())
            }
            Err(e) => {
                let error = EngineError::Storage(e.to_string());
                self.audit.failure(
                    file_id,
                    caller,
                    AuditOperation::Export,
                    format!("{}: {error}", error.kind()),
                );
                Err(error)
            }
        }
    }

    /// Stop accepting work and wait for queued tasks.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }

    fn audited<T>(
        &self,
        caller: &Caller,
        operation: AuditOperation,
        run: impl FnOnce() -> Result<(T, String)>,
    ) -> Result<T> {
        match run() {
            Ok((value, details)) => {
                self.audit
                    .success(RULE_ENGINE_FILE_ID, caller, operation, details);
                Ok(value)
            }
            Err(error) => {
                self.audit.failure(
                    RULE_ENGINE_FILE_ID,
                    caller,
                    operation,
                    format!("{}: {error}", error.kind()),
                );
                Err(error)
            }
        }
    }
}
