use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::DataFrame;

use fieldsync_core::FileProcessingResult;

pub fn print_summary(result: &FileProcessingResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Status"),
        header_cell("Encoding"),
        header_cell("Rows"),
        header_cell("Chunks"),
        header_cell("Skipped"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        file_cell(result.path.as_deref()),
        status_cell(result),
        result.encoding.map_or_else(|| dim_cell("-"), Cell::new),
        count_cell(result.success.then_some(result.rows), Color::Green),
        count_cell(result.success.then_some(result.chunks_processed), Color::Blue),
        count_cell(Some(result.skipped_rows), Color::Yellow),
        count_cell(Some(result.warnings.len()), Color::Yellow),
    ]);
    println!("{table}");
    print_warning_table(result);
    if !result.success {
        eprintln!("error: {}", result.message);
    }
}

fn print_warning_table(result: &FileProcessingResult) {
    if result.warnings.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Step"),
        header_cell("Message"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for warning in &result.warnings {
        table.add_row(vec![
            Cell::new(&warning.column)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(warning.step.as_str()).fg(Color::Yellow),
            Cell::new(&warning.message),
        ]);
    }
    println!();
    println!("Column warnings:");
    println!("{table}");
}

pub fn print_preview(table: &DataFrame, rows: usize) {
    println!();
    println!("{}", table.head(Some(rows)));
}

pub fn print_export_path(path: &Path) {
    println!("{}", path.display());
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn file_cell(path: Option<&Path>) -> Cell {
    match path.and_then(Path::file_name) {
        Some(name) => Cell::new(name.to_string_lossy()),
        None => dim_cell("-"),
    }
}

fn status_cell(result: &FileProcessingResult) -> Cell {
    if result.success {
        return Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold);
    }
    let label = result
        .failure
        .map_or_else(|| "failed".to_string(), |kind| kind.to_string());
    Cell::new(label)
        .fg(Color::Red)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
