//! CLI argument definitions for the rule engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "tabrule",
    version,
    about = "Apply normalization, aggregation and flag rules to tabular data",
    long_about = "Infer the schema of CSV files and run named rules against them.\n\n\
                  Rules are loaded from a JSON rule document of the form\n\
                  {\"normalization\": {...}, \"aggregation\": {...}, \"flag\": {...}}."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Engine configuration file (TOML). Defaults apply when it does not exist.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Infer and print the schema of a CSV file.
    Schema(SchemaArgs),

    /// Run rules from a rule document against a CSV file.
    Apply(ApplyArgs),

    /// List built-in rule templates.
    Templates(TemplatesArgs),

    /// Work with rule documents.
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// CSV file to inspect.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// CSV file to process.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Rule document (JSON) providing the named rules.
    #[arg(long = "rules", value_name = "JSON")]
    pub rules: PathBuf,

    /// Normalization rules to run, in order.
    #[arg(long = "normalization", value_name = "NAMES", value_delimiter = ',')]
    pub normalization: Vec<String>,

    /// Aggregation rule to run.
    #[arg(long = "aggregation", value_name = "NAME")]
    pub aggregation: Option<String>,

    /// Flag rules to run, in order.
    #[arg(long = "flag", value_name = "NAMES", value_delimiter = ',')]
    pub flag: Vec<String>,

    /// Write the result table as CSV.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Maximum result rows printed to the terminal.
    #[arg(long = "limit", value_name = "ROWS", default_value_t = 20)]
    pub limit: usize,
}

#[derive(Parser)]
pub struct TemplatesArgs {
    /// Only list templates of this kind.
    #[arg(long = "kind", value_enum)]
    pub kind: Option<RuleKindArg>,
}

#[derive(Subcommand)]
pub enum RulesCommand {
    /// Validate a rule document without running it.
    Check(RulesCheckArgs),
}

#[derive(Parser)]
pub struct RulesCheckArgs {
    /// Rule document to validate.
    #[arg(value_name = "JSON")]
    pub document: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RuleKindArg {
    Normalization,
    Aggregation,
    Flag,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
