use std::fmt::Write;
use std::path::Path;

use comfy_table::{Cell, Color as TableColor};

use super::styling::{caution, done, heading, muted, value};
use super::tables::{color_coded_coverage_cell, color_coded_duration_cell, create_table, label_cell};
use super::writer::RunMetadata;

/// Failed files listed individually; the rest are counted.
const FAILED_FILE_LIMIT: usize = 10;

/// Prints the end-of-run table to stderr.
///
/// Color coding:
/// - Green: every file documented, run under 10 minutes
/// - Yellow: some files failed, run under 30 minutes
/// - Red: no file documented, longer runs
pub fn print_summary(metadata: &RunMetadata, output_dir: &Path) {
    eprintln!("{}", render_summary(metadata, output_dir));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{emoji} {}", heading(title));
}

fn render_summary(metadata: &RunMetadata, output_dir: &Path) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Run Summary");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n",
        muted("Project:"),
        value(&metadata.project),
        muted("Model:"),
        value(&metadata.model),
        muted("Finished:"),
        muted(metadata.finished_at.format("%Y-%m-%d %H:%M UTC"))
    );

    let mut table = create_table();
    table.set_header(vec![label_cell("Metric"), label_cell("Value")]);
    table.add_row(vec![
        Cell::new("Files analyzed"),
        Cell::new(metadata.files_analyzed),
    ]);
    table.add_row(vec![
        Cell::new("Files documented"),
        color_coded_coverage_cell(metadata.files_documented, metadata.failed_files.len()),
    ]);
    table.add_row(vec![Cell::new("Commits"), Cell::new(metadata.commits)]);
    table.add_row(vec![Cell::new("Tags"), Cell::new(metadata.tags)]);
    table.add_row(vec![Cell::new("Authors"), Cell::new(metadata.authors)]);
    table.add_row(vec![
        Cell::new("Duration"),
        color_coded_duration_cell(metadata.duration_secs),
    ]);
    let _ = writeln!(output, "{table}\n");

    if !metadata.failed_files.is_empty() {
        add_section_header(&mut output, "⚠️", "Failed Files");
        let mut failed = create_table();
        for path in metadata.failed_files.iter().take(FAILED_FILE_LIMIT) {
            failed.add_row(vec![Cell::new(path).fg(TableColor::Red)]);
        }
        if metadata.failed_files.len() > FAILED_FILE_LIMIT {
            failed.add_row(vec![Cell::new(format!(
                "... and {} more",
                metadata.failed_files.len() - FAILED_FILE_LIMIT
            ))
            .fg(TableColor::DarkGrey)]);
        }
        let _ = writeln!(output, "{failed}\n");
        let _ = writeln!(
            output,
            "  {}",
            caution("Failed files keep an error note in place of their documentation.")
        );
    }

    let _ = writeln!(
        output,
        "  {} {}",
        done("Documentation written to"),
        value(output_dir.display())
    );
    output
}
