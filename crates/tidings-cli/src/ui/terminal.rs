//! Terminal presenter - one rewritable progress line plus plain notices
//!
//! Progress is drawn with a carriage return so that successive values
//! overwrite each other; any other output first terminates the open
//! progress line so nothing gets garbled.

use super::theme::Theme;
use crossterm::{
    QueueableCommand,
    style::{Color, Stylize},
    terminal::{Clear, ClearType},
};
use std::io::{Stderr, Write};
use std::sync::{Mutex, PoisonError};
use tidings_core::{OutcomeCode, Presenter};

struct Screen<W> {
    writer: W,
    /// A progress line is on screen without a trailing newline.
    line_open: bool,
}

/// A [`Presenter`] writing to a terminal-like sink.
pub struct TerminalPresenter<W: Write + Send> {
    screen: Mutex<Screen<W>>,
    theme: Theme,
    color: bool,
}

impl<W: Write + Send> std::fmt::Debug for TerminalPresenter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPresenter")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl TerminalPresenter<Stderr> {
    /// Presenter on the process's stderr.
    pub fn stderr(color: bool) -> Self {
        Self::new(std::io::stderr(), color)
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    /// Presenter on `writer`. Without `color` no escape sequences are written.
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            screen: Mutex::new(Screen {
                writer,
                line_open: false,
            }),
            theme: Theme::default(),
            color,
        }
    }

    /// Give back the sink (used by tests to inspect output).
    pub fn into_inner(self) -> W {
        self.screen
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.to_string().with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn with_screen(&self, f: impl FnOnce(&mut Screen<W>) -> std::io::Result<()>) {
        let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        // Output failures must not take the operation down with them.
        if let Err(e) = f(&mut *screen).and_then(|()| screen.writer.flush()) {
            tracing::debug!(error = %e, "terminal write failed");
        }
    }

    /// Start a fresh line if a progress line is still open.
    fn close_line(screen: &mut Screen<W>) -> std::io::Result<()> {
        if screen.line_open {
            writeln!(screen.writer)?;
            screen.line_open = false;
        }
        Ok(())
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn render_progress(&self, label: &str, percent: u8) {
        let label = self.paint(label, self.theme.colors.progress);
        let value = self.paint(&format!("[{percent:>3}%]"), self.theme.colors.secondary);
        let color = self.color;
        self.with_screen(|screen| {
            if color {
                screen.writer.queue(Clear(ClearType::CurrentLine))?;
            }
            write!(screen.writer, "\r{label} {value}")?;
            screen.line_open = true;
            Ok(())
        });
    }

    fn render_done(&self) {
        let done = self.paint("[done]", self.theme.colors.success);
        self.with_screen(|screen| {
            if screen.line_open {
                writeln!(screen.writer, " {done}")?;
            } else {
                writeln!(screen.writer, "{done}")?;
            }
            screen.line_open = false;
            Ok(())
        });
    }

    fn render_error(&self, outcome: OutcomeCode, message: &str) {
        let text = if message.is_empty() {
            format!("{} {outcome}", self.theme.icons.error)
        } else {
            format!("{} {outcome}: {message}", self.theme.icons.error)
        };
        let text = self.paint(&text, self.theme.colors.error);
        self.with_screen(|screen| {
            Self::close_line(screen)?;
            writeln!(screen.writer, "{text}")
        });
    }

    fn notice(&self, message: &str) {
        self.with_screen(|screen| {
            Self::close_line(screen)?;
            writeln!(screen.writer, "{message}")
        });
    }

    fn line_reset(&self) {
        self.with_screen(|screen| {
            write!(screen.writer, "\r")?;
            // The next progress value overwrites this line in place.
            screen.line_open = true;
            Ok(())
        });
    }
}
