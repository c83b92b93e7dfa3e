//! Terminal user interface: presenter, prompter and theme.

mod prompt;
mod terminal;
mod theme;

pub use prompt::LinePrompter;
pub use terminal::TerminalPresenter;
pub use theme::{ColorScheme, Icons, Theme};
