//! UI Theme - Design system constants
//!
//! Colors and icons used by the terminal presenter and prompter.

use crossterm::style::Color;

/// Default theme for tidings output
#[derive(Debug, Clone, Default)]
pub struct Theme {
    /// Colors for different UI elements
    pub colors: ColorScheme,
    /// Status icons
    pub icons: Icons,
}

/// Color scheme for UI elements
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Progress labels
    pub progress: Color,
    /// Percentages and sizes
    pub secondary: Color,
    /// Completion markers
    pub success: Color,
    /// Errors and problems
    pub error: Color,
    /// Questions waiting for input
    pub prompt: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            progress: Color::Cyan,
            secondary: Color::DarkGrey,
            success: Color::Green,
            error: Color::Red,
            prompt: Color::Yellow,
        }
    }
}

/// Status icons for different states
#[derive(Debug, Clone)]
pub struct Icons {
    /// Error/failed state (✗)
    pub error: &'static str,
    /// Question state (?)
    pub prompt: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            error: "✗",
            prompt: "?",
        }
    }
}
