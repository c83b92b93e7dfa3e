//! Resolvable download narration.
//!
//! One primary subject plus three optional nested sub-phases (delta
//! download, delta apply, patch download). Only the primary subject's
//! problems ask for a decision; sub-phase failures are optimisations that
//! degrade to the full download, so they are only printed.

use super::lock;
use crate::channel::Receiver;
use crate::error::Fatal;
use crate::event::{Event, EventKind};
use crate::progress::ProgressTracker;
use crate::types::{Decision, OutcomeCode, Resolvable, SourceLocator, format_size};
use crate::ui::{Presenter, Prompter};
use std::sync::{Arc, Mutex};

/// Lifecycle of the primary subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectState {
    /// No download in flight.
    #[default]
    Idle,
    /// Started and accepting progress.
    Active,
    /// An abort decision was returned; only `finish` is accepted.
    Aborted,
}

#[derive(Debug, Default)]
struct Primary {
    subject: Option<Resolvable>,
    source: Option<SourceLocator>,
    state: SubjectState,
    progress: ProgressTracker,
    problem_seen: bool,
}

impl Primary {
    fn accepts(&self, subject: &Resolvable) -> bool {
        self.state == SubjectState::Active
            && self.subject.as_ref().is_some_and(|s| s.same_subject(subject))
    }
}

#[derive(Debug, Default)]
struct SubPhase {
    path: String,
    size: u64,
    active: bool,
    progress: ProgressTracker,
}

impl SubPhase {
    fn start(&mut self, path: &str, size: u64) {
        self.path = path.to_string();
        self.size = size;
        self.active = true;
        self.progress.reset();
    }

    /// Clamp `value`, or `None` if the phase is not running.
    fn advance(&mut self, phase: &'static str, value: i32) -> Option<u8> {
        if !self.active {
            tracing::warn!(phase, value, "progress for a phase that is not running");
            return None;
        }
        Some(self.progress.advance(value))
    }

    fn finish(&mut self, phase: &'static str) {
        self.active = false;
        tracing::debug!(
            phase,
            path = %self.path,
            size = self.size,
            last = ?self.progress.last(),
            "phase finished"
        );
    }
}

fn describe_size(size: u64) -> String {
    if size == 0 {
        "unknown size".to_string()
    } else {
        format_size(size)
    }
}

#[derive(Debug, Default)]
struct TransferInner {
    primary: Primary,
    delta_download: SubPhase,
    delta_apply: SubPhase,
    patch_download: SubPhase,
}

/// Receiver for [`EventKind::Transfer`] events.
pub struct TransferReporter {
    presenter: Arc<dyn Presenter>,
    prompter: Option<Arc<dyn Prompter>>,
    inner: Mutex<TransferInner>,
}

impl std::fmt::Debug for TransferReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferReporter")
            .field("inner", &*lock(&self.inner))
            .finish_non_exhaustive()
    }
}

impl TransferReporter {
    /// Create a reporter. Without a prompter every problem resolves to abort.
    pub fn new(presenter: Arc<dyn Presenter>, prompter: Option<Arc<dyn Prompter>>) -> Self {
        Self {
            presenter,
            prompter,
            inner: Mutex::new(TransferInner::default()),
        }
    }

    /// Lifecycle state of the primary subject.
    pub fn state(&self) -> SubjectState {
        lock(&self.inner).primary.state
    }

    /// The primary subject currently (or last) tracked.
    pub fn subject(&self) -> Option<Resolvable> {
        lock(&self.inner).primary.subject.clone()
    }

    /// Source the current subject is downloaded from.
    pub fn source(&self) -> Option<SourceLocator> {
        lock(&self.inner).primary.source.clone()
    }

    /// Download of `subject` from `source` started.
    pub fn start(&self, subject: &Resolvable, source: &SourceLocator) {
        {
            let mut inner = lock(&self.inner);
            let primary = &mut inner.primary;
            if primary.state == SubjectState::Active {
                tracing::warn!(
                    previous = ?primary.subject.as_ref().map(ToString::to_string),
                    "transfer started while another was still active"
                );
            }
            primary.subject = Some(subject.clone());
            primary.source = Some(source.clone());
            primary.state = SubjectState::Active;
            primary.progress.reset();
            primary.problem_seen = false;
        }

        let mut line = format!("Downloading: {subject}");
        if let Some(archive) = subject.archive_size {
            line.push_str(&format!(", {}", format_size(archive)));
            if let Some(installed) = subject.installed_size {
                line.push_str(&format!(" ({} unpacked)", format_size(installed)));
            }
        }
        self.presenter.notice(&line);
    }

    /// Download progress. Always lets the engine continue; cancellation
    /// happens only through a problem decision.
    pub fn progress(&self, value: i32, subject: &Resolvable) -> bool {
        let accepted = {
            let mut inner = lock(&self.inner);
            if inner.primary.accepts(subject) {
                Some(inner.primary.progress.advance(value))
            } else {
                tracing::warn!(%subject, value, "progress for a subject that is not active; rejected");
                None
            }
        };
        if let Some(percent) = accepted {
            self.presenter
                .render_progress(&format!("Downloading {}", subject.name), percent);
        }
        true
    }

    /// The download failed; ask what to do. The answer is binding for the
    /// engine: retry the same transfer, skip this subject, or stop the batch.
    pub fn problem(&self, subject: &Resolvable, outcome: OutcomeCode, description: &str) -> Decision {
        {
            let mut inner = lock(&self.inner);
            if inner.primary.subject.as_ref().is_some_and(|s| s.same_subject(subject)) {
                inner.primary.problem_seen = true;
            }
            if !inner.primary.accepts(subject) {
                tracing::warn!(%subject, state = ?inner.primary.state, "problem for a transfer that is not active");
            }
        }
        self.presenter.render_error(outcome, description);

        let decision = self
            .prompter
            .as_ref()
            .map_or(Decision::Abort, |p| p.prompt_decision(Decision::Abort));
        tracing::info!(%subject, %outcome, %decision, "transfer problem resolved");

        if decision == Decision::Abort {
            let mut inner = lock(&self.inner);
            if inner.primary.subject.as_ref().is_some_and(|s| s.same_subject(subject)) {
                inner.primary.state = SubjectState::Aborted;
            }
        }
        decision
    }

    /// The engine left `subject` unfinished. Recorded as its problem without
    /// asking anyone; the following finish prints the outcome.
    pub fn interrupted(&self, subject: &Resolvable, outcome: OutcomeCode, description: &str) {
        let mut inner = lock(&self.inner);
        if inner.primary.subject.as_ref().is_some_and(|s| s.same_subject(subject)) {
            inner.primary.problem_seen = true;
        }
        tracing::debug!(%subject, %outcome, description, "transfer interrupted");
    }

    /// Download of `subject` ended. A failed outcome is printed, not escalated.
    pub fn finish(&self, subject: &Resolvable, outcome: OutcomeCode, reason: &str) {
        {
            let mut inner = lock(&self.inner);
            let primary = &mut inner.primary;
            let tracked = primary.state != SubjectState::Idle
                && primary.subject.as_ref().is_some_and(|s| s.same_subject(subject));
            if !tracked {
                tracing::warn!(%subject, "finish for a transfer that was not started; ignored");
                return;
            }
            if !outcome.is_ok() && !primary.problem_seen {
                tracing::warn!(%subject, %outcome, "transfer failed without a reported problem");
            }
            primary.state = SubjectState::Idle;
        }

        if outcome.is_ok() {
            self.presenter.render_done();
        } else {
            self.presenter.render_error(outcome, reason);
        }
    }

    /// Delta download started. `size` is 0 when unknown.
    pub fn start_delta_download(&self, path: &str, size: u64) {
        lock(&self.inner).delta_download.start(path, size);
        self.presenter
            .notice(&format!("Downloading delta: {path}, {}", describe_size(size)));
    }

    /// Delta download progress. Always continues.
    pub fn progress_delta_download(&self, value: i32) -> bool {
        let accepted = lock(&self.inner)
            .delta_download
            .advance("delta download", value);
        if let Some(percent) = accepted {
            self.presenter.render_progress("Downloading delta", percent);
        }
        true
    }

    /// Delta download problem. Printed only; the engine falls back to the
    /// full download.
    pub fn problem_delta_download(&self, description: &str) {
        self.presenter.notice(description);
    }

    /// Delta download ended.
    pub fn finish_delta_download(&self) {
        lock(&self.inner).delta_download.finish("delta download");
        self.presenter.render_done();
    }

    /// Delta application started on the downloaded file at `path`.
    pub fn start_delta_apply(&self, path: &str) {
        lock(&self.inner).delta_apply.start(path, 0);
        self.presenter.notice(&format!("Applying delta: {path}"));
    }

    /// Delta application progress. Applying cannot be interrupted.
    pub fn progress_delta_apply(&self, value: i32) {
        let accepted = lock(&self.inner).delta_apply.advance("delta apply", value);
        if let Some(percent) = accepted {
            self.presenter.render_progress("Applying delta", percent);
        }
    }

    /// Delta application problem. Printed only.
    pub fn problem_delta_apply(&self, description: &str) {
        self.presenter.notice(description);
    }

    /// Delta application ended.
    pub fn finish_delta_apply(&self) {
        lock(&self.inner).delta_apply.finish("delta apply");
        self.presenter.render_done();
    }

    /// Patch package download started. `size` is 0 when unknown.
    pub fn start_patch_download(&self, path: &str, size: u64) {
        lock(&self.inner).patch_download.start(path, size);
        self.presenter
            .notice(&format!("Downloading patch: {path}, {}", describe_size(size)));
    }

    /// Patch package download progress. Always continues.
    pub fn progress_patch_download(&self, value: i32) -> bool {
        let accepted = lock(&self.inner)
            .patch_download
            .advance("patch download", value);
        if let Some(percent) = accepted {
            self.presenter.render_progress("Downloading patch", percent);
        }
        true
    }

    /// Patch package download problem. Printed only.
    pub fn problem_patch_download(&self, description: &str) {
        self.presenter.notice(description);
    }

    /// Patch package download ended.
    pub fn finish_patch_download(&self) {
        lock(&self.inner).patch_download.finish("patch download");
        self.presenter.render_done();
    }
}

impl Receiver for TransferReporter {
    fn capabilities(&self) -> &'static [EventKind] {
        &[EventKind::Transfer]
    }

    fn receive(&self, event: &Event) -> Result<Option<Decision>, Fatal> {
        match event {
            Event::TransferStart { subject, source } => self.start(subject, source),
            Event::TransferProgress { subject, value } => {
                self.progress(*value, subject);
            }
            Event::TransferProblem {
                subject,
                outcome,
                description,
                interrupted: false,
            } => return Ok(Some(self.problem(subject, *outcome, description))),
            Event::TransferProblem {
                subject,
                outcome,
                description,
                interrupted: true,
            } => self.interrupted(subject, *outcome, description),
            Event::TransferFinish {
                subject,
                outcome,
                reason,
            } => self.finish(subject, *outcome, reason),
            Event::DeltaDownloadStart { path, size } => self.start_delta_download(path, *size),
            Event::DeltaDownloadProgress { value } => {
                self.progress_delta_download(*value);
            }
            Event::DeltaDownloadProblem { description } => self.problem_delta_download(description),
            Event::DeltaDownloadFinish => self.finish_delta_download(),
            Event::DeltaApplyStart { path } => self.start_delta_apply(path),
            Event::DeltaApplyProgress { value } => self.progress_delta_apply(*value),
            Event::DeltaApplyProblem { description } => self.problem_delta_apply(description),
            Event::DeltaApplyFinish => self.finish_delta_apply(),
            Event::PatchDownloadStart { path, size } => self.start_patch_download(path, *size),
            Event::PatchDownloadProgress { value } => {
                self.progress_patch_download(*value);
            }
            Event::PatchDownloadProblem { description } => self.problem_patch_download(description),
            Event::PatchDownloadFinish => self.finish_patch_download(),
            _ => {}
        }
        Ok(None)
    }
}
