use console::style;

use crate::triage::CategoryTag;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Category label colored by who usually owns the fix: infrastructure
/// (yellow), product or workload (red), unclassified (dim).
pub fn category(tag: CategoryTag) -> console::StyledObject<String> {
    match tag {
        CategoryTag::Maintenance
        | CategoryTag::Install
        | CategoryTag::Provision
        | CategoryTag::Deprovision
        | CategoryTag::MustGather => bright_yellow(tag),
        CategoryTag::Unknown | CategoryTag::ProwOther => dim(tag),
        _ => bright_red(tag),
    }
}
