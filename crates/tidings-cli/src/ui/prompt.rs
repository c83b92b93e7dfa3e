//! Line-based decision prompt
//!
//! Asks "Abort, retry, ignore?" and reads one answer per line. Unattended
//! runs and closed input resolve to the default without blocking.

use super::theme::Theme;
use crossterm::style::Stylize;
use std::io::{BufRead, BufReader, Stderr, Stdin, Write};
use std::sync::{Mutex, PoisonError};
use tidings_core::{Decision, Prompter};

/// How many unrecognised answers are tolerated before taking the default.
const MAX_ATTEMPTS: usize = 3;

struct Console<R, W> {
    input: R,
    output: W,
}

/// A [`Prompter`] reading answers line by line.
pub struct LinePrompter<R: BufRead + Send, W: Write + Send> {
    console: Mutex<Console<R, W>>,
    interactive: bool,
    unattended: Option<Decision>,
    color: bool,
}

impl<R: BufRead + Send, W: Write + Send> std::fmt::Debug for LinePrompter<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinePrompter")
            .field("interactive", &self.interactive)
            .field("unattended", &self.unattended)
            .finish_non_exhaustive()
    }
}

impl LinePrompter<BufReader<Stdin>, Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdio(interactive: bool, unattended: Option<Decision>, color: bool) -> Self {
        Self::new(
            BufReader::new(std::io::stdin()),
            std::io::stderr(),
            interactive,
            unattended,
        )
        .with_color(color)
    }
}

impl<R: BufRead + Send, W: Write + Send> LinePrompter<R, W> {
    /// Prompter over arbitrary streams.
    ///
    /// When `interactive` is false nothing is read; `unattended` (or the
    /// caller's default) is returned straight away.
    pub fn new(input: R, output: W, interactive: bool, unattended: Option<Decision>) -> Self {
        Self {
            console: Mutex::new(Console { input, output }),
            interactive,
            unattended,
            color: false,
        }
    }

    /// Enable or disable colored prompts.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Give back the output stream (used by tests).
    pub fn into_output(self) -> W {
        self.console
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .output
    }

    fn question(&self, default: Decision) -> String {
        let theme = Theme::default();
        let text = format!(
            "{} Abort, retry, ignore? [a/r/i] ({}): ",
            theme.icons.prompt,
            default.key()
        );
        if self.color {
            text.with(theme.colors.prompt).to_string()
        } else {
            text
        }
    }

    fn ask(&self, default: Decision) -> std::io::Result<Decision> {
        let question = self.question(default);
        let mut console = self.console.lock().unwrap_or_else(PoisonError::into_inner);
        let Console { input, output } = &mut *console;

        for _ in 0..MAX_ATTEMPTS {
            write!(output, "{question}")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                tracing::debug!(%default, "input closed; using default decision");
                return Ok(default);
            }
            if line.trim().is_empty() {
                return Ok(default);
            }
            if let Some(decision) = Decision::from_answer(&line) {
                return Ok(decision);
            }
            writeln!(output, "Please answer a, r or i.")?;
        }
        Ok(default)
    }
}

impl<R: BufRead + Send, W: Write + Send> Prompter for LinePrompter<R, W> {
    fn prompt_decision(&self, default_if_unattended: Decision) -> Decision {
        if !self.interactive {
            return self.unattended.unwrap_or(default_if_unattended);
        }
        self.ask(default_if_unattended).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot read decision; using default");
            default_if_unattended
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> LinePrompter<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), true, None)
    }

    #[test]
    fn test_reads_answer() {
        let p = prompter("r\n");
        assert_eq!(p.prompt_decision(Decision::Abort), Decision::Retry);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Abort, retry, ignore? [a/r/i] (a): "));
    }

    #[test]
    fn test_empty_line_takes_default() {
        assert_eq!(prompter("\n").prompt_decision(Decision::Ignore), Decision::Ignore);
    }

    #[test]
    fn test_closed_input_takes_default() {
        assert_eq!(prompter("").prompt_decision(Decision::Abort), Decision::Abort);
    }

    #[test]
    fn test_reasks_on_garbage() {
        let p = prompter("maybe\nIGNORE\n");
        assert_eq!(p.prompt_decision(Decision::Abort), Decision::Ignore);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("Abort, retry, ignore?").count(), 2);
    }

    #[test]
    fn test_gives_up_after_attempts() {
        assert_eq!(
            prompter("x\ny\nz\nr\n").prompt_decision(Decision::Abort),
            Decision::Abort
        );
    }

    #[test]
    fn test_unattended_never_reads() {
        let p = LinePrompter::new(
            Cursor::new(b"r\n".to_vec()),
            Vec::new(),
            false,
            Some(Decision::Ignore),
        );
        assert_eq!(p.prompt_decision(Decision::Abort), Decision::Ignore);
        assert!(p.into_output().is_empty());

        let p = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), false, None);
        assert_eq!(p.prompt_decision(Decision::Abort), Decision::Abort);
    }
}
