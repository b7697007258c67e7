use console::{style, StyledObject};
use std::fmt::Display;

// Terminal palette by role. Colors only; whether they show is decided by
// `console` for the current stream.

/// Section titles such as the stage list and summary tables.
pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

/// A stage or batch that is still running.
pub fn running(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn done(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

/// Caveats that do not fail the run.
pub fn caution(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).yellow()
}

pub fn failure(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red().bold()
}

/// Project names, model names and paths.
pub fn value(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

/// Labels and secondary details.
pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn brand(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
