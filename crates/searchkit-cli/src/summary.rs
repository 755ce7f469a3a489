use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use searchkit_cli::session::{RowReport, SessionResult, StepOutcome, StepReport};
use searchkit_core::RowKind;

pub fn print_rows(rows: &[RowReport]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Row"),
        header_cell("Kind"),
        header_cell("Open"),
        header_cell("Heading"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for row in rows {
        table.add_row(vec![
            id_cell(row),
            Cell::new(row.kind.label()),
            open_cell(row),
            Cell::new(&row.heading),
        ]);
    }
    println!("{table}");
}

pub fn print_session(result: &SessionResult) {
    if !result.steps.is_empty() {
        print_steps(&result.steps);
        println!();
    }
    print_rows(&result.rows);
}

fn print_steps(steps: &[StepReport]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Event"),
        header_cell("Result"),
        header_cell("Detail"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, step) in steps.iter().enumerate() {
        let (result, detail) = outcome_cells(&step.outcome);
        table.add_row(vec![
            dim_cell(index + 1),
            Cell::new(&step.event),
            result,
            detail,
        ]);
    }
    println!("{table}");
}

fn outcome_cells(outcome: &StepOutcome) -> (Cell, Cell) {
    match outcome {
        StepOutcome::Local => (dim_cell("local"), dim_cell("-")),
        StepOutcome::Applied {
            sequence,
            row_count,
        } => (
            Cell::new("reloaded")
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
            Cell::new(format!("#{sequence}: {row_count} rows")),
        ),
        StepOutcome::Failed { message, retryable } => {
            let detail = if *retryable {
                format!("{message} (retryable)")
            } else {
                message.clone()
            };
            (
                Cell::new("failed")
                    .fg(Color::Red)
                    .add_attribute(Attribute::Bold),
                Cell::new(detail).fg(Color::Red),
            )
        }
        StepOutcome::Discarded { sequence, latest } => (
            Cell::new("discarded").fg(Color::Yellow),
            Cell::new(format!("#{sequence} superseded by #{latest}")),
        ),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn id_cell(row: &RowReport) -> Cell {
    match row.kind {
        RowKind::LogicGroup => Cell::new(&row.id)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        RowKind::FilterRule => Cell::new(&row.id),
    }
}

fn open_cell(row: &RowReport) -> Cell {
    if !row.collapsible {
        dim_cell("-")
    } else if row.open {
        Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        dim_cell("·")
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
