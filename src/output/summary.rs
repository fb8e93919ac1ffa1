use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::cleanup::{CleanupOutcome, CleanupReport};

use super::styling::{dim, failure, heading, success};
use super::tables::{create_table, cyan_header, failure_count_cell, outcome_cell};

/// Prints a human-readable summary of a cleanup to stdout.
///
/// Always shows the kept/deleted/failed counts. Failed runs are listed
/// with their cause; a dry run lists the runs it would delete.
pub fn print_report(report: &CleanupReport) {
    println!("{}", render_report(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", heading(emoji), heading(title).underlined());
}

fn render_overview(output: &mut String, report: &CleanupReport) {
    add_section_header(output, "📋", "Overview");

    let mut table = create_table();
    table.add_row(vec![Cell::new("Organization"), Cell::new(&report.organization)]);
    table.add_row(vec![Cell::new("Project"), Cell::new(&report.target.project)]);
    table.add_row(vec![
        Cell::new("Pipeline"),
        Cell::new(format!(
            "{} ({})",
            report.target.pipeline_id, report.target.pipeline_type
        )),
    ]);
    table.add_row(vec![Cell::new("Policy"), Cell::new(report.policy)]);
    table.add_row(vec![
        Cell::new("Mode"),
        if report.dry_run {
            Cell::new("dry run").fg(TableColor::Yellow)
        } else {
            Cell::new("live")
        },
    ]);

    let _ = writeln!(output, "{table}\n");
}

fn render_counts(output: &mut String, report: &CleanupReport) {
    add_section_header(output, "📊", "Results");

    let mut table = create_table();
    let mut header = vec!["Total", "Kept", "Deleted", "Failed"];
    if report.dry_run {
        header.push("Would delete");
    }
    table.set_header(cyan_header(&header));

    let mut row = vec![
        Cell::new(report.outcomes.len()),
        Cell::new(report.kept),
        Cell::new(report.deleted),
        failure_count_cell(report.failed),
    ];
    if report.dry_run {
        row.push(Cell::new(report.planned).fg(TableColor::Yellow));
    }
    table.add_row(row);

    let _ = writeln!(output, "{table}\n");
}

fn render_failures(output: &mut String, report: &CleanupReport) {
    add_section_header(output, "❌", "Failed Runs");

    let mut table = create_table();
    table.set_header(cyan_header(&["Run ID", "Name", "Cause"]));
    for outcome in &report.outcomes {
        if let CleanupOutcome::Failed(cause) = &outcome.outcome {
            table.add_row(vec![
                Cell::new(outcome.run_id),
                Cell::new(&outcome.display_name),
                Cell::new(cause).fg(TableColor::Red),
            ]);
        }
    }

    let _ = writeln!(output, "{table}\n");
}

fn render_plan(output: &mut String, report: &CleanupReport) {
    add_section_header(output, "🗂️", "Plan");

    let mut table = create_table();
    table.set_header(cyan_header(&["Run ID", "Name", "Created", "Action"]));
    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(outcome.run_id),
            Cell::new(&outcome.display_name),
            Cell::new(outcome.created_at.format("%Y-%m-%d %H:%M UTC")),
            outcome_cell(&outcome.outcome),
        ]);
    }

    let _ = writeln!(output, "{table}\n");
}

/// Renders the report to a string.
pub fn render_report(report: &CleanupReport) -> String {
    let mut output = String::new();

    render_overview(&mut output, report);
    render_counts(&mut output, report);

    if report.dry_run && !report.outcomes.is_empty() {
        render_plan(&mut output, report);
    }

    if !report.failures.is_empty() {
        render_failures(&mut output, report);
    }

    let verdict = if report.outcomes.is_empty() {
        dim("No runs found for this pipeline.").to_string()
    } else if report.dry_run {
        success(format!(
            "Dry run complete: {} run(s) would be deleted.",
            report.planned
        ))
        .to_string()
    } else if report.is_success() {
        success(format!("Cleanup complete: {} run(s) deleted.", report.deleted)).to_string()
    } else {
        failure(format!(
            "Cleanup finished with {} failure(s): run ids {}",
            report.failed,
            report
                .failures
                .keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .to_string()
    };
    let _ = writeln!(output, "{verdict}");

    output
}
