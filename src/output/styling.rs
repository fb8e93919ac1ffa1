use std::fmt::Display;

use console::{Style, StyledObject};

fn paint(style: Style, text: impl Display) -> StyledObject<String> {
    style.apply_to(text.to_string())
}

/// Work in progress (spinner messages)
pub fn pending(text: impl Display) -> StyledObject<String> {
    paint(Style::new().yellow().bright(), text)
}

pub fn success(text: impl Display) -> StyledObject<String> {
    paint(Style::new().green().bright(), text)
}

pub fn failure(text: impl Display) -> StyledObject<String> {
    paint(Style::new().red().bright(), text)
}

/// Section titles; callers add `.underlined()` where needed
pub fn heading(text: impl Display) -> StyledObject<String> {
    paint(Style::new().bright(), text)
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    paint(Style::new().dim(), text)
}

pub fn banner(text: impl Display) -> StyledObject<String> {
    paint(Style::new().blue().bold(), text)
}
