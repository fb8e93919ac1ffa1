use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::cleanup::{CleanupOutcome, SkipReason};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Count cell that turns red when non-zero; used for failures.
pub fn failure_count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count).fg(TableColor::Green)
    } else {
        Cell::new(count).fg(TableColor::Red)
    }
}

pub fn outcome_cell(outcome: &CleanupOutcome) -> Cell {
    match outcome {
        CleanupOutcome::Deleted => Cell::new("deleted").fg(TableColor::Green),
        CleanupOutcome::Skipped(SkipReason::Kept) => Cell::new("kept").fg(TableColor::Blue),
        CleanupOutcome::Skipped(SkipReason::DryRun) => {
            Cell::new("would delete").fg(TableColor::Yellow)
        }
        CleanupOutcome::Failed(_) => Cell::new("failed").fg(TableColor::Red),
    }
}
