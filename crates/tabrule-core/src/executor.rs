//! Rule execution pipeline.
//!
//! An apply request runs a fixed sequence of steps over a private working
//! copy of the dataset:
//!
//! 1. **infer_schema** - infer and store the schema unless already cached
//! 2. **normalize** - each selected normalization rule, in caller order
//! 3. **clean** - cleaning rules embedded in the aggregation config
//! 4. **aggregate** - the (at most one) selected aggregation
//! 5. **flag** - each selected flag rule, in caller order
//! 6. **assemble** - build the [`ExecutionResult`]
//!
//! Each executed step appends one audit entry. The first fatal error stops
//! the pipeline, marks the file `Failed` and discards the working copy, so
//! no partial output is ever returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tabrule_aggregate::{AggregationEngine, columns, referenced_columns};
use tabrule_model::{
    AggregationConfig, AuditOperation, Caller, Dataset, EngineError, ExecutionResult,
    ExecutionState, FlagConfig, NormalizationConfig, Result, RuleConfig, RuleKind,
};
use tabrule_transform::{
    CleaningPipeline, InferenceSettings, NormalizationEngine, apply_flag, infer_schema,
};
use tracing::{debug, info, info_span, warn};

use crate::audit::AuditLog;
use crate::config::EngineConfig;
use crate::storage::DatasetStorage;
use crate::store::RuleStore;

/// Rule names selected for one apply request, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSelection {
    pub normalization: Vec<String>,
    pub aggregation: Vec<String>,
    pub flag: Vec<String>,
}

impl RuleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(mut self, name: impl Into<String>) -> Self {
        self.normalization.push(name.into());
        self
    }

    pub fn aggregate(mut self, name: impl Into<String>) -> Self {
        self.aggregation.push(name.into());
        self
    }

    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flag.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.normalization.is_empty() && self.aggregation.is_empty() && self.flag.is_empty()
    }
}

/// Rule configs looked up once, before any step runs.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRules {
    pub normalization: Vec<(String, NormalizationConfig)>,
    pub aggregation: Option<(String, AggregationConfig)>,
    pub flag: Vec<(String, FlagConfig)>,
}

impl ResolvedRules {
    /// Look up every selected rule. Unknown names are `NotFound`; selecting
    /// more than one aggregation is a validation error.
    pub fn resolve(store: &RuleStore, selection: &RuleSelection) -> Result<Self> {
        if selection.aggregation.len() > 1 {
            return Err(EngineError::validation(
                "at most one aggregation rule may be applied",
                selection,
            ));
        }
        let mut resolved = Self::default();
        for name in &selection.normalization {
            if let RuleConfig::Normalization(config) =
                &store.get(RuleKind::Normalization, name)?.config
            {
                resolved.normalization.push((name.clone(), config.clone()));
            }
        }
        if let Some(name) = selection.aggregation.first()
            && let RuleConfig::Aggregation(config) = &store.get(RuleKind::Aggregation, name)?.config
        {
            resolved.aggregation = Some((name.clone(), config.clone()));
        }
        for name in &selection.flag {
            if let RuleConfig::Flag(config) = &store.get(RuleKind::Flag, name)?.config {
                resolved.flag.push((name.clone(), config.clone()));
            }
        }
        Ok(resolved)
    }
}

/// Transform engines shared by all steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engines {
    pub inference: InferenceSettings,
    pub normalization: NormalizationEngine,
    pub cleaning: CleaningPipeline,
    pub aggregation: AggregationEngine,
}

impl Engines {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            inference: config.inference_settings(),
            normalization: NormalizationEngine::new(config.date_order),
            cleaning: CleaningPipeline::new(config.date_order),
            aggregation: AggregationEngine::new(config.date_order),
        }
    }
}

/// Working state of one apply request.
pub struct ExecutionContext<'a> {
    pub file_id: &'a str,
    pub rules: &'a ResolvedRules,
    pub engines: &'a Engines,
    pub storage: &'a dyn DatasetStorage,
    /// Working copy; the stored dataset is never modified.
    pub dataset: Dataset,
    pub warnings: Vec<String>,
    pub result: Option<ExecutionResult>,
}

/// A single step of the execution pipeline.
pub trait ExecutionStep: Send + Sync {
    /// Run the step, returning the audit detail line.
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String>;

    fn step_name(&self) -> &str;

    fn operation(&self) -> AuditOperation;

    /// State the file is in once this step succeeds, if it moves it.
    fn reached(&self) -> Option<ExecutionState>;

    /// Whether the step has nothing to do for this request.
    fn should_skip(&self, _ctx: &ExecutionContext<'_>) -> bool {
        false
    }
}

/// Ordered pipeline of execution steps.
pub struct ExecutionPipeline {
    steps: Vec<Box<dyn ExecutionStep>>,
}

impl Default for ExecutionPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExecutionPipeline {
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// infer_schema, normalize, clean, aggregate, flag, assemble.
    pub fn standard() -> Self {
        Self::empty()
            .add_step(Box::new(InferSchemaStep))
            .add_step(Box::new(NormalizeStep))
            .add_step(Box::new(CleanStep))
            .add_step(Box::new(AggregateStep))
            .add_step(Box::new(FlagStep))
            .add_step(Box::new(AssembleStep))
    }

    pub fn add_step(mut self, step: Box<dyn ExecutionStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_name()).collect()
    }
}

/// Last known [`ExecutionState`] per file id.
#[derive(Debug, Default)]
pub struct ExecutionStates {
    states: Mutex<HashMap<String, ExecutionState>>,
}

impl ExecutionStates {
    pub fn get(&self, file_id: &str) -> Option<ExecutionState> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(file_id).copied()
    }

    /// Start a new lifecycle for `file_id`.
    pub fn begin(&self, file_id: &str) {
        self.set(file_id, ExecutionState::Uploaded);
    }

    /// Move to `next` if that is a legal transition; returns whether it moved.
    pub fn advance(&self, file_id: &str, next: ExecutionState) -> bool {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let current = states.entry(file_id.to_string()).or_default();
        if current.can_advance_to(next) {
            *current = next;
            true
        } else {
            false
        }
    }

    fn set(&self, file_id: &str, state: ExecutionState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(file_id.to_string(), state);
    }
}

/// Runs apply requests against the rule store and dataset storage.
pub struct RuleExecutor {
    store: Arc<RuleStore>,
    storage: Arc<dyn DatasetStorage>,
    audit: AuditLog,
    states: Arc<ExecutionStates>,
    engines: Engines,
    pipeline: ExecutionPipeline,
}

impl RuleExecutor {
    pub fn new(
        store: Arc<RuleStore>,
        storage: Arc<dyn DatasetStorage>,
        audit: AuditLog,
        states: Arc<ExecutionStates>,
        engines: Engines,
    ) -> Self {
        Self {
            store,
            storage,
            audit,
            states,
            engines,
            pipeline: ExecutionPipeline::standard(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: ExecutionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Run one apply request to completion.
    ///
    /// `progress` receives a non-decreasing percentage, ending at 100 on
    /// success.
    pub fn execute(
        &self,
        file_id: &str,
        selection: &RuleSelection,
        caller: &Caller,
        progress: &dyn Fn(u8),
    ) -> Result<ExecutionResult> {
        let span = info_span!("apply", file_id);
        let _guard = span.enter();
        progress(0);

        let prepared = ResolvedRules::resolve(&self.store, selection)
            .and_then(|rules| Ok((rules, self.storage.read(file_id)?)));
        let (rules, dataset) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(%error, "apply rejected");
                self.audit.failure(
                    file_id,
                    caller,
                    AuditOperation::Apply,
                    format!("{}: {error}", error.kind()),
                );
                return Err(error);
            }
        };

        self.states.begin(file_id);
        let mut ctx = ExecutionContext {
            file_id,
            rules: &rules,
            engines: &self.engines,
            storage: self.storage.as_ref(),
            dataset,
            warnings: Vec::new(),
            result: None,
        };
        let total = self.pipeline.steps.len().max(1);
        for (index, step) in self.pipeline.steps.iter().enumerate() {
            if step.should_skip(&ctx) {
                debug!(step = step.step_name(), "skipped");
            } else {
                let step_span = info_span!("step", name = step.step_name());
                let _step_guard = step_span.enter();
                match step.execute(&mut ctx) {
                    Ok(details) => {
                        self.audit.success(file_id, caller, step.operation(), details);
                        if let Some(state) = step.reached() {
                            self.states.advance(file_id, state);
                        }
                    }
                    Err(error) => {
                        warn!(%error, "step failed");
                        self.audit.failure(
                            file_id,
                            caller,
                            step.operation(),
                            format!("{}: {error}", error.kind()),
                        );
                        self.states.advance(file_id, ExecutionState::Failed);
                        return Err(error);
                    }
                }
            }
            progress(percent(index + 1, total));
        }

        let result = ctx.result.take().unwrap_or_else(|| {
            ExecutionResult::from_dataset(std::mem::take(&mut ctx.dataset), ctx.warnings.clone())
        });
        info!(
            rows = result.total_rows,
            columns = result.total_columns,
            warnings = result.warnings.len(),
            "apply finished"
        );
        Ok(result)
    }
}

fn percent(done: usize, total: usize) -> u8 {
    u8::try_from((done * 100 / total).min(100)).unwrap_or(100)
}

// ============================================================================
// Standard steps
// ============================================================================

pub struct InferSchemaStep;

impl ExecutionStep for InferSchemaStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        if ctx.dataset.schema.is_some() {
            return Ok("schema cached".to_string());
        }
        let schema = infer_schema(&ctx.dataset, &ctx.engines.inference)?;
        ctx.storage.write_schema(ctx.file_id, &schema)?;
        let details = format!("inferred {} columns", schema.columns.len());
        ctx.dataset.schema = Some(schema);
        Ok(details)
    }

    fn step_name(&self) -> &str {
        "infer_schema"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::InferSchema
    }

    fn reached(&self) -> Option<ExecutionState> {
        Some(ExecutionState::SchemaInferred)
    }
}

pub struct NormalizeStep;

impl ExecutionStep for NormalizeStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        let mut names = Vec::new();
        for (name, config) in &ctx.rules.normalization {
            let warnings = ctx
                .engines
                .normalization
                .apply(&mut ctx.dataset, name, config)?;
            ctx.warnings.extend(warnings.iter().map(ToString::to_string));
            names.push(name.as_str());
        }
        Ok(format!("applied normalization rules: {}", names.join(", ")))
    }

    fn step_name(&self) -> &str {
        "normalize"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::Normalize
    }

    fn reached(&self) -> Option<ExecutionState> {
        Some(ExecutionState::Normalized)
    }

    fn should_skip(&self, ctx: &ExecutionContext<'_>) -> bool {
        ctx.rules.normalization.is_empty()
    }
}

pub struct CleanStep;

impl ExecutionStep for CleanStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        let Some((name, config)) = &ctx.rules.aggregation else {
            return Ok("no cleaning rules".to_string());
        };
        // Reject bad references against the aggregation config before the
        // cleaning rules touch any row.
        config.validate()?;
        let referenced = referenced_columns(config, &ctx.dataset);
        columns::validate_references(config, &ctx.dataset, &referenced)?;

        let report = ctx.engines.cleaning.apply(
            &mut ctx.dataset,
            config.cleaning_rules(),
            &referenced.monitored(),
        )?;
        ctx.warnings
            .extend(report.warnings.iter().map(ToString::to_string));
        Ok(format!(
            "cleaned for '{name}': {} -> {} rows, {} filled",
            report.rows_before, report.rows_after, report.filled
        ))
    }

    fn step_name(&self) -> &str {
        "clean"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::Clean
    }

    fn reached(&self) -> Option<ExecutionState> {
        Some(ExecutionState::Cleaned)
    }

    fn should_skip(&self, ctx: &ExecutionContext<'_>) -> bool {
        ctx.rules
            .aggregation
            .as_ref()
            .is_none_or(|(_, config)| config.cleaning_rules().is_noop())
    }
}

pub struct AggregateStep;

impl ExecutionStep for AggregateStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        let Some((name, config)) = &ctx.rules.aggregation else {
            return Ok("no aggregation".to_string());
        };
        let aggregated = ctx.engines.aggregation.aggregate(&ctx.dataset, config)?;
        ctx.warnings
            .extend(aggregated.warnings.iter().map(ToString::to_string));
        let details = format!(
            "{} '{name}': {} rows -> {} rows",
            config.kind_name(),
            ctx.dataset.height(),
            aggregated.table.height()
        );
        ctx.dataset = aggregated.table;
        Ok(details)
    }

    fn step_name(&self) -> &str {
        "aggregate"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::Aggregate
    }

    fn reached(&self) -> Option<ExecutionState> {
        Some(ExecutionState::Aggregated)
    }

    fn should_skip(&self, ctx: &ExecutionContext<'_>) -> bool {
        ctx.rules.aggregation.is_none()
    }
}

pub struct FlagStep;

impl ExecutionStep for FlagStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        let total = ctx.dataset.height();
        let mut lines = Vec::new();
        for (name, config) in &ctx.rules.flag {
            let matched = apply_flag(&mut ctx.dataset, name, config)?;
            lines.push(format!("flag '{name}': {matched} of {total} rows flagged"));
        }
        let details = lines.join("; ");
        ctx.warnings.extend(lines);
        Ok(details)
    }

    fn step_name(&self) -> &str {
        "flag"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::Flag
    }

    fn reached(&self) -> Option<ExecutionState> {
        Some(ExecutionState::Flagged)
    }

    fn should_skip(&self, ctx: &ExecutionContext<'_>) -> bool {
        ctx.rules.flag.is_empty()
    }
}

pub struct AssembleStep;

impl ExecutionStep for AssembleStep {
    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<String> {
        let dataset = std::mem::take(&mut ctx.dataset);
        let result = ExecutionResult::from_dataset(dataset, std::mem::take(&mut ctx.warnings));
        let details = format!(
            "{} rows x {} columns, {} warnings",
            result.total_rows,
            result.total_columns,
            result.warnings.len()
        );
        ctx.result = Some(result);
        Ok(details)
    }

    fn step_name(&self) -> &str {
        "assemble"
    }

    fn operation(&self) -> AuditOperation {
        AuditOperation::Assemble
    }

    fn reached(&self) -> Option<ExecutionState> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_order() {
        assert_eq!(
            ExecutionPipeline::standard().step_names(),
            vec!["infer_schema", "normalize", "clean", "aggregate", "flag", "assemble"]
        );
    }

    #[test]
    fn two_aggregations_are_rejected() {
        let store = RuleStore::new();
        let selection = RuleSelection::new().aggregate("a").aggregate("b");
        let err = ResolvedRules::resolve(&store, &selection).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn states_never_move_backwards() {
        let states = ExecutionStates::default();
        states.begin("f");
        assert!(states.advance("f", ExecutionState::Aggregated));
        assert!(!states.advance("f", ExecutionState::Normalized));
        assert!(states.advance("f", ExecutionState::Failed));
        assert_eq!(states.get("f"), Some(ExecutionState::Failed));
    }

    #[test]
    fn percent_is_capped() {
        assert_eq!(percent(3, 6), 50);
        assert_eq!(percent(7, 6), 100);
    }
}
