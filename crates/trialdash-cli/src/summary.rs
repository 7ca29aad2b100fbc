use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use trialdash_cli::pipeline::PipelineResult;
use trialdash_ingest::{LoadReport, UnitStatus};

pub fn print_summary(result: &PipelineResult) {
    println!("{}", result.report.range_message);
    match &result.export {
        Some(export) => {
            println!("Output: {}", result.output_dir.display());
            println!("Manifest: {}", export.workbook.manifest.display());
            if let Some(path) = &export.json {
                println!("JSON: {}", path.display());
            }
        }
        None => println!("Output: {} (dry run, nothing written)", result.output_dir.display()),
    }

    print_unit_table(result);
    print_sheet_table(result);

    let mut errors: Vec<String> = Vec::new();
    if let Some(reason) = &result.data.dictionary_error {
        errors.push(format!("display terms: {reason}"));
    }
    errors.extend(result.data.errors.iter().cloned());
    errors.extend(
        result
            .report
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.id.sheet_name(), failure.reason)),
    );
    if !errors.is_empty() {
        eprintln!("Errors:");
        for error in &errors {
            eprintln!("- {error}");
        }
    }
}

fn print_unit_table(result: &PipelineResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Unit"),
        header_cell("Location"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    add_unit_rows(&mut table, "subjects", &result.data.subjects);
    add_unit_rows(&mut table, "events", &result.data.events);
    if table.row_count() > 0 {
        println!("{table}");
    }
}

fn add_unit_rows<T>(table: &mut Table, source: &str, report: &LoadReport<T>) {
    for unit in &report.units {
        table.add_row(vec![
            dim_cell(source),
            Cell::new(&unit.unit),
            dim_cell(&unit.location),
            status_cell(&unit.status),
        ]);
    }
}

fn print_sheet_table(result: &PipelineResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Title"),
        header_cell("Rows"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for sheet in &result.report.sheets {
        let failed = result
            .report
            .failures
            .iter()
            .any(|failure| failure.id == sheet.id);
        let status = if failed {
            Cell::new("error").fg(Color::Red).add_attribute(Attribute::Bold)
        } else if sheet.table.is_placeholder() {
            dim_cell("no data")
        } else {
            Cell::new("ok").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(sheet.name).fg(Color::Cyan),
            Cell::new(&sheet.table.title),
            count_cell(sheet.table.rows.len()),
            status,
        ]);
    }
    println!("{table}");
}

fn status_cell(status: &UnitStatus) -> Cell {
    match status {
        UnitStatus::Loaded { .. } => Cell::new(status).fg(Color::Green),
        UnitStatus::Empty => dim_cell(status),
        UnitStatus::FetchFailed { .. } | UnitStatus::ParseFailed { .. } => {
            Cell::new(status).fg(Color::Red).add_attribute(Attribute::Bold)
        }
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
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
