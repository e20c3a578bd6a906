use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use tabrule_model::{ColumnType, Dataset, DatasetSchema, ExecutionResult, RuleTemplate, Value};
use tabrule_cli::pipeline::RuleCheck;

pub fn print_schema(schema: &DatasetSchema) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Nullable"),
        header_cell("Nulls"),
        header_cell("Distinct"),
        header_cell("Min"),
        header_cell("Max"),
        header_cell("Mean"),
        header_cell("Sample"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for column in &schema.columns {
        let stats = &column.sample_stats;
        let sample = stats
            .sample_values
            .iter()
            .take(3)
            .map(Value::render)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&column.name).add_attribute(Attribute::Bold),
            type_cell(column.inferred_type),
            Cell::new(if column.nullable { "yes" } else { "no" }),
            count_cell(stats.null_count, Color::Yellow),
            Cell::new(stats.distinct_count),
            number_cell(stats.min),
            number_cell(stats.max),
            number_cell(stats.mean),
            dim_cell(sample),
        ]);
    }
    println!("{table}");

    let quality = &schema.quality;
    if quality.duplicate_rows > 0 {
        println!("Duplicate rows: {}", quality.duplicate_rows);
    }
    for sparse in &quality.sparse_columns {
        println!(
            "Sparse column: {} ({:.1}% null)",
            sparse.column, sparse.null_percentage
        );
    }
}

pub fn print_result(result: &ExecutionResult, limit: usize) {
    let mut table = Table::new();
    table.set_header(result.columns.iter().map(|column| header_cell(column)));
    apply_table_style(&mut table);
    for row in result.rows.iter().take(limit) {
        table.add_row(
            result
                .columns
                .iter()
                .map(|column| value_cell(Dataset::cell(row, column))),
        );
    }
    println!("{table}");
    if result.total_rows > limit {
        println!("... {} more rows", result.total_rows - limit);
    }
    println!(
        "Rows: {}  Columns: {}",
        result.total_rows, result.total_columns
    );
    if !result.warnings.is_empty() {
        eprintln!("Warnings:");
        for warning in &result.warnings {
            eprintln!("- {warning}");
        }
    }
}

pub fn print_templates(templates: &[&RuleTemplate]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Template"),
        header_cell("Description"),
        header_cell("Config"),
    ]);
    apply_table_style(&mut table);
    for template in templates {
        table.add_row(vec![
            Cell::new(template.kind).fg(Color::Cyan),
            Cell::new(template.name).add_attribute(Attribute::Bold),
            Cell::new(template.description),
            dim_cell(template.config.to_json()),
        ]);
    }
    println!("{table}");
}

pub fn print_rule_check(check: &RuleCheck) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Kind"), header_cell("Rules")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("normalization"), Cell::new(check.normalization)]);
    table.add_row(vec![Cell::new("aggregation"), Cell::new(check.aggregation)]);
    table.add_row(vec![Cell::new("flag"), Cell::new(check.flag)]);
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(check.total()).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).add_attribute(Attribute::Dim)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn number_cell(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(Value::Number(v).render()),
        None => dim_cell("-"),
    }
}

fn type_cell(column_type: ColumnType) -> Cell {
    let color = match column_type {
        ColumnType::Numeric => Color::Green,
        ColumnType::Datetime => Color::Blue,
        ColumnType::Categorical => Color::Magenta,
        ColumnType::Text => Color::White,
    };
    Cell::new(column_type).fg(color)
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => dim_cell("null"),
        Value::Bool(true) => Cell::new("true").fg(Color::Red).add_attribute(Attribute::Bold),
        Value::Number(_) => Cell::new(value.render()).set_alignment(CellAlignment::Right),
        other => Cell::new(other.render()),
    }
}
