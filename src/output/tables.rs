use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn label_cell(label: &str) -> Cell {
    Cell::new(label).fg(TableColor::Cyan)
}

/// Green when every file was documented, yellow when some failed, red when
/// none succeeded.
pub fn color_coded_coverage_cell(documented: usize, failed: usize) -> Cell {
    let text = format!("{documented}/{}", documented + failed);
    if failed == 0 {
        Cell::new(text).fg(TableColor::Green)
    } else if documented > 0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn color_coded_duration_cell(seconds: f64) -> Cell {
    let minutes = seconds / 60.0;
    let text = if minutes < 1.0 {
        format!("{seconds:.1}s")
    } else {
        format!("{minutes:.1}min")
    };
    if minutes <= 10.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if minutes <= 30.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}
