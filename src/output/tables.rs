use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::triage::CategoryTag;

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

/// Share of all failures taken by one category.
pub fn color_coded_share_cell(percentage: f64) -> Cell {
    let text = format!("{percentage:.0}%");
    if percentage >= 50.0 {
        Cell::new(text).fg(TableColor::Red)
    } else if percentage >= 20.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Green)
    }
}

pub fn category_cell(tag: CategoryTag) -> Cell {
    let color = match tag {
        CategoryTag::Maintenance
        | CategoryTag::Install
        | CategoryTag::Provision
        | CategoryTag::Deprovision
        | CategoryTag::MustGather => TableColor::Yellow,
        CategoryTag::Unknown | CategoryTag::ProwOther => TableColor::DarkGrey,
        _ => TableColor::Red,
    };
    Cell::new(tag.label()).fg(color)
}
