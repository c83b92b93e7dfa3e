//! Presentation and interaction boundaries
//!
//! These traits let the reporters render progress and ask for decisions
//! without being coupled to a specific terminal or GUI implementation.

use crate::types::{Decision, OutcomeCode};

/// Pure output sink for the reporters.
pub trait Presenter: Send + Sync {
    /// Show `label` at `percent` (0..=100), overwriting the current line.
    fn render_progress(&self, label: &str, percent: u8);

    /// Close the current progress line as completed.
    fn render_done(&self);

    /// Show an error or problem message.
    fn render_error(&self, outcome: OutcomeCode, message: &str);

    /// Print a plain informational line.
    fn notice(&self, message: &str);

    /// Return to the start of the current line without ending it.
    fn line_reset(&self);
}

impl<T: Presenter + ?Sized> Presenter for std::sync::Arc<T> {
    fn render_progress(&self, label: &str, percent: u8) {
        (**self).render_progress(label, percent);
    }
    fn render_done(&self) {
        (**self).render_done();
    }
    fn render_error(&self, outcome: OutcomeCode, message: &str) {
        (**self).render_error(outcome, message);
    }
    fn notice(&self, message: &str) {
        (**self).notice(message);
    }
    fn line_reset(&self) {
        (**self).line_reset();
    }
}

/// Source of human decisions for decision-bearing problems.
pub trait Prompter: Send + Sync {
    /// Ask what to do. May block on real input.
    ///
    /// `default_if_unattended` is returned when nobody can answer.
    fn prompt_decision(&self, default_if_unattended: Decision) -> Decision;
}

impl<T: Prompter + ?Sized> Prompter for std::sync::Arc<T> {
    fn prompt_decision(&self, default_if_unattended: Decision) -> Decision {
        (**self).prompt_decision(default_if_unattended)
    }
}

/// A presenter that discards everything.
#[derive(Debug, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render_progress(&self, _: &str, _: u8) {}
    fn render_done(&self) {}
    fn render_error(&self, _: OutcomeCode, _: &str) {}
    fn notice(&self, _: &str) {}
    fn line_reset(&self) {}
}

/// A prompter for unattended runs: always answers the default.
#[derive(Debug, Clone, Copy)]
pub struct Unattended;

impl Prompter for Unattended {
    fn prompt_decision(&self, default_if_unattended: Decision) -> Decision {
        default_if_unattended
    }
}
