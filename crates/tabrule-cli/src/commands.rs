use std::time::Instant;

use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, warn};

use tabrule_cli::pipeline::{
    Session, build_selection, check_rule_document, cli_caller, infer_file_schema,
};
use tabrule_core::{EngineConfig, templates};
use tabrule_model::{ExecutionResult, RuleKind};

use crate::cli::{ApplyArgs, RuleKindArg, RulesCheckArgs, SchemaArgs, TemplatesArgs};
use crate::summary::{print_result, print_rule_check, print_schema, print_templates};

pub fn run_schema(args: &SchemaArgs, config: &EngineConfig) -> Result<()> {
    let schema = infer_file_schema(&args.input, config)?;
    print_schema(&schema);
    Ok(())
}

pub fn run_apply(args: &ApplyArgs, config: &EngineConfig) -> Result<ExecutionResult> {
    let selection = build_selection(&args.normalization, args.aggregation.as_deref(), &args.flag);
    if selection.is_empty() {
        warn!("no rules selected; the result will be the input table");
    }
    let session = Session::open(config, &args.input, &args.rules, cli_caller())?;
    let span = info_span!("apply", file_id = %session.file_id);
    let _guard = span.enter();
    let started = Instant::now();

    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos:>3}%") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(session.file_id.clone());
    let outcome = session.run(selection, |percent| bar.set_position(u64::from(percent)));
    bar.finish_and_clear();
    let result = outcome?;

    info!(
        rows = result.total_rows,
        columns = result.total_columns,
        warnings = result.warnings.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "apply finished"
    );
    if let Some(path) = &args.output {
        session.export(&result, path)?;
        println!("Output: {}", path.display());
    }
    print_result(&result, args.limit);
    session.close();
    Ok(result)
}

pub fn run_templates(args: &TemplatesArgs) -> Result<()> {
    let kinds: Vec<RuleKind> = match args.kind {
        Some(kind) => vec![rule_kind(kind)],
        None => RuleKind::ALL.to_vec(),
    };
    let listed: Vec<_> = kinds.into_iter().flat_map(templates::templates).collect();
    print_templates(&listed);
    Ok(())
}

pub fn run_rules_check(args: &RulesCheckArgs) -> Result<()> {
    let check = check_rule_document(&args.document)?;
    if check.total() == 0 {
        bail!("rule document {} contains no rules", args.document.display());
    }
    println!("Rule document: {}", args.document.display());
    print_rule_check(&check);
    Ok(())
}

fn rule_kind(kind: RuleKindArg) -> RuleKind {
    match kind {
        RuleKindArg::Normalization => RuleKind::Normalization,
        RuleKindArg::Aggregation => RuleKind::Aggregation,
        RuleKindArg::Flag => RuleKind::Flag,
    }
}
