//! Recording collaborators for tests.
//!
//! These capture every call instead of touching a terminal, so reporter
//! behaviour can be asserted precisely.

use crate::channel::Receiver;
use crate::error::Fatal;
use crate::event::{Event, EventKind};
use crate::types::{Decision, OutcomeCode};
use crate::ui::{Presenter, Prompter};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One presentation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// `render_progress(label, percent)`
    Progress(String, u8),
    /// `render_done()`
    Done,
    /// `render_error(outcome, message)`
    Error(OutcomeCode, String),
    /// `notice(message)`
    Notice(String),
    /// `line_reset()`
    LineReset,
}

/// A [`Presenter`] that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<Rendered>>,
}

impl RecordingPresenter {
    /// Everything rendered so far.
    pub fn rendered(&self) -> Vec<Rendered> {
        lock(&self.calls).clone()
    }

    /// Only the notice lines.
    pub fn notices(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|r| match r {
                Rendered::Notice(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Percentages rendered for `label`, in order.
    pub fn progress_values(&self, label: &str) -> Vec<u8> {
        lock(&self.calls)
            .iter()
            .filter_map(|r| match r {
                Rendered::Progress(l, percent) if l == label => Some(*percent),
                _ => None,
            })
            .collect()
    }

    /// How many completion lines were rendered.
    pub fn count_done(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|r| matches!(r, Rendered::Done))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn render_progress(&self, label: &str, percent: u8) {
        lock(&self.calls).push(Rendered::Progress(label.to_string(), percent));
    }
    fn render_done(&self) {
        lock(&self.calls).push(Rendered::Done);
    }
    fn render_error(&self, outcome: OutcomeCode, message: &str) {
        lock(&self.calls).push(Rendered::Error(outcome, message.to_string()));
    }
    fn notice(&self, message: &str) {
        lock(&self.calls).push(Rendered::Notice(message.to_string()));
    }
    fn line_reset(&self) {
        lock(&self.calls).push(Rendered::LineReset);
    }
}

/// A [`Prompter`] that answers from a queue, then falls back to the default.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Decision>>,
    offered: Mutex<Vec<Decision>>,
}

impl ScriptedPrompter {
    /// Answer with `answers` in order.
    pub fn new(answers: &[Decision]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            offered: Mutex::new(Vec::new()),
        }
    }

    /// How many times a decision was requested.
    pub fn calls(&self) -> usize {
        lock(&self.offered).len()
    }

    /// The defaults passed with each request.
    pub fn defaults_offered(&self) -> Vec<Decision> {
        lock(&self.offered).clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_decision(&self, default_if_unattended: Decision) -> Decision {
        lock(&self.offered).push(default_if_unattended);
        lock(&self.answers)
            .pop_front()
            .unwrap_or(default_if_unattended)
    }
}

/// A [`Receiver`] that records every event and never answers.
#[derive(Debug)]
pub struct EventRecorder {
    kinds: &'static [EventKind],
    events: Mutex<Vec<Event>>,
}

impl EventRecorder {
    /// Record events of `kinds`.
    pub fn new(kinds: &'static [EventKind]) -> Self {
        Self {
            kinds,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Everything received so far.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Number of received events whose name is `name` (see [`Event::name`]).
    pub fn count(&self, name: &str) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| e.name() == name)
            .count()
    }
}

impl Receiver for EventRecorder {
    fn capabilities(&self) -> &'static [EventKind] {
        self.kinds
    }

    fn receive(&self, event: &Event) -> Result<Option<Decision>, Fatal> {
        lock(&self.events).push(event.clone());
        Ok(None)
    }
}
