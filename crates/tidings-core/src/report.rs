//! Engine-facing send handles.
//!
//! The retrieval engine does not build [`Event`]s by hand; it holds one of
//! these handles per phase and calls `start` / `progress` / `problem` /
//! `finish`. The handles publish on the channel and apply the defaults when
//! nobody answers a problem (abort).
//!
//! [`TransferReport`] and [`SourceTaskReport`] are scope guards: dropping one
//! while a subject is started but not finished publishes the missing
//! `Finish` with [`OutcomeCode::Unknown`], so every start is paired with
//! exactly one finish even on early exit. Unless a problem was already
//! reported for that subject, an `interrupted` problem precedes the finish;
//! it is never answered.

use crate::channel::EventChannel;
use crate::error::Fatal;
use crate::event::Event;
use crate::types::{Decision, OutcomeCode, Resolvable, SourceId, SourceLocator};
use std::cell::Cell;

const INTERRUPTED: &str = "interrupted";

/// Publish an event whose receivers are not expected to raise [`Fatal`].
///
/// A fatal signal from a foreign receiver on these kinds is logged and
/// turned into an abort.
fn emit(channel: &EventChannel, event: &Event) -> Option<Decision> {
    match channel.publish(event) {
        Ok(decision) => decision,
        Err(fatal) => {
            tracing::error!(event = event.name(), %fatal, "fatal signal outside of probing");
            Some(fatal.decision())
        }
    }
}

/// Send side of source type detection.
#[derive(Debug, Clone, Copy)]
pub struct ProbeReport<'a> {
    channel: &'a EventChannel,
}

impl<'a> ProbeReport<'a> {
    /// Publish probe events on `channel`.
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel }
    }

    /// Detection of `locator` started.
    ///
    /// # Errors
    ///
    /// Propagates a [`Fatal`] raised by a receiver.
    pub fn start(&self, locator: &SourceLocator) -> Result<(), Fatal> {
        self.channel.publish(&Event::ProbeStart {
            locator: locator.clone(),
        })?;
        Ok(())
    }

    /// Candidate `type_name` did not match.
    ///
    /// # Errors
    ///
    /// Propagates a [`Fatal`] raised by a receiver.
    pub fn failed_probe(&self, locator: &SourceLocator, type_name: &str) -> Result<(), Fatal> {
        self.channel.publish(&Event::ProbeFailedVariant {
            locator: locator.clone(),
            type_name: type_name.to_string(),
        })?;
        Ok(())
    }

    /// `locator` was recognised as `type_name`.
    ///
    /// # Errors
    ///
    /// Propagates a [`Fatal`] raised by a receiver.
    pub fn success_probe(&self, locator: &SourceLocator, type_name: &str) -> Result<(), Fatal> {
        self.channel.publish(&Event::ProbeSucceeded {
            locator: locator.clone(),
            type_name: type_name.to_string(),
        })?;
        Ok(())
    }

    /// Detection progress. Returns whether to continue (always `true`).
    ///
    /// # Errors
    ///
    /// Propagates a [`Fatal`] raised by a receiver.
    pub fn progress(&self, locator: &SourceLocator, value: i32) -> Result<bool, Fatal> {
        self.channel.publish(&Event::ProbeProgress {
            locator: locator.clone(),
            value,
        })?;
        Ok(true)
    }

    /// Detection hit a problem. Without receivers the answer is abort.
    ///
    /// # Errors
    ///
    /// Returns [`Fatal`] whenever a probe reporter is listening.
    pub fn problem(
        &self,
        locator: &SourceLocator,
        outcome: OutcomeCode,
        description: &str,
    ) -> Result<Decision, Fatal> {
        self.channel.publish(&Event::ProbeProblem {
            locator: locator.clone(),
            outcome,
            description: description.to_string(),
        })?;
        Ok(Decision::Abort)
    }

    /// Detection ended.
    ///
    /// # Errors
    ///
    /// Returns [`Fatal`] when `outcome` is not ok and a probe reporter is
    /// listening.
    pub fn finish(
        &self,
        locator: &SourceLocator,
        outcome: OutcomeCode,
        reason: &str,
    ) -> Result<(), Fatal> {
        self.channel.publish(&Event::ProbeFinish {
            locator: locator.clone(),
            outcome,
            reason: reason.to_string(),
        })?;
        Ok(())
    }
}

/// Send side of a resolvable download and its delta/patch sub-phases.
#[derive(Debug)]
pub struct TransferReport<'a> {
    channel: &'a EventChannel,
    open: Option<Resolvable>,
    problem_reported: Cell<bool>,
}

impl<'a> TransferReport<'a> {
    /// Publish transfer events on `channel`.
    pub fn new(channel: &'a EventChannel) -> Self {
        Self {
            channel,
            open: None,
            problem_reported: Cell::new(false),
        }
    }

    /// The subject started and not yet finished.
    pub fn open_subject(&self) -> Option<&Resolvable> {
        self.open.as_ref()
    }

    /// Download of `subject` from `source` started.
    ///
    /// A subject still open from an earlier start is finished first.
    pub fn start(&mut self, subject: &Resolvable, source: &SourceLocator) {
        if let Some(previous) = self.open.take() {
            tracing::warn!(%previous, "transfer restarted without finish; closing it");
            self.close_interrupted(previous);
        }
        emit(
            self.channel,
            &Event::TransferStart {
                subject: subject.clone(),
                source: source.clone(),
            },
        );
        self.open = Some(subject.clone());
        self.problem_reported.set(false);
    }

    /// Download progress of the open subject. Returns whether to continue.
    pub fn progress(&self, value: i32) -> bool {
        let Some(subject) = &self.open else {
            tracing::warn!(value, "transfer progress without an open subject");
            return true;
        };
        emit(
            self.channel,
            &Event::TransferProgress {
                subject: subject.clone(),
                value,
            },
        );
        true
    }

    /// The open subject hit a problem. The returned decision is binding.
    pub fn problem(&self, outcome: OutcomeCode, description: &str) -> Decision {
        let Some(subject) = &self.open else {
            tracing::warn!(%outcome, "transfer problem without an open subject");
            return Decision::Abort;
        };
        self.problem_reported.set(true);
        emit(
            self.channel,
            &Event::TransferProblem {
                subject: subject.clone(),
                outcome,
                description: description.to_string(),
                interrupted: false,
            },
        )
        .unwrap_or(Decision::Abort)
    }

    /// Download of the open subject ended.
    pub fn finish(&mut self, outcome: OutcomeCode, reason: &str) {
        match self.open.take() {
            Some(subject) => self.emit_finish(subject, outcome, reason),
            None => tracing::warn!(%outcome, "transfer finish without an open subject"),
        }
    }

    /// Finish `subject` as interrupted, reporting the problem first if the
    /// engine did not.
    fn close_interrupted(&self, subject: Resolvable) {
        if !self.problem_reported.replace(false) {
            emit(
                self.channel,
                &Event::TransferProblem {
                    subject: subject.clone(),
                    outcome: OutcomeCode::Unknown,
                    description: INTERRUPTED.to_string(),
                    interrupted: true,
                },
            );
        }
        self.emit_finish(subject, OutcomeCode::Unknown, INTERRUPTED);
    }

    fn emit_finish(&self, subject: Resolvable, outcome: OutcomeCode, reason: &str) {
        emit(
            self.channel,
            &Event::TransferFinish {
                subject,
                outcome,
                reason: reason.to_string(),
            },
        );
    }

    /// Delta download started. `size` is 0 when unknown.
    pub fn start_delta_download(&self, path: &str, size: u64) {
        emit(
            self.channel,
            &Event::DeltaDownloadStart {
                path: path.to_string(),
                size,
            },
        );
    }

    /// Delta download progress. Returns whether to continue.
    pub fn progress_delta_download(&self, value: i32) -> bool {
        emit(self.channel, &Event::DeltaDownloadProgress { value });
        true
    }

    /// Delta download problem. Informational only.
    pub fn problem_delta_download(&self, description: &str) {
        emit(
            self.channel,
            &Event::DeltaDownloadProblem {
                description: description.to_string(),
            },
        );
    }

    /// Delta download ended.
    pub fn finish_delta_download(&self) {
        emit(self.channel, &Event::DeltaDownloadFinish);
    }

    /// Delta application started on the local file `path`.
    pub fn start_delta_apply(&self, path: &str) {
        emit(
            self.channel,
            &Event::DeltaApplyStart {
                path: path.to_string(),
            },
        );
    }

    /// Delta application progress. Cannot be interrupted.
    pub fn progress_delta_apply(&self, value: i32) {
        emit(self.channel, &Event::DeltaApplyProgress { value });
    }

    /// Delta application problem. Informational only.
    pub fn problem_delta_apply(&self, description: &str) {
        emit(
            self.channel,
            &Event::DeltaApplyProblem {
                description: description.to_string(),
            },
        );
    }

    /// Delta application ended.
    pub fn finish_delta_apply(&self) {
        emit(self.channel, &Event::DeltaApplyFinish);
    }

    /// Patch package download started. `size` is 0 when unknown.
    pub fn start_patch_download(&self, path: &str, size: u64) {
        emit(
            self.channel,
            &Event::PatchDownloadStart {
                path: path.to_string(),
                size,
            },
        );
    }

    /// Patch package download progress. Returns whether to continue.
    pub fn progress_patch_download(&self, value: i32) -> bool {
        emit(self.channel, &Event::PatchDownloadProgress { value });
        true
    }

    /// Patch package download problem. Informational only.
    pub fn problem_patch_download(&self, description: &str) {
        emit(
            self.channel,
            &Event::PatchDownloadProblem {
                description: description.to_string(),
            },
        );
    }

    /// Patch package download ended.
    pub fn finish_patch_download(&self) {
        emit(self.channel, &Event::PatchDownloadFinish);
    }
}

impl Drop for TransferReport<'_> {
    fn drop(&mut self) {
        if let Some(subject) = self.open.take() {
            tracing::debug!(%subject, "closing unfinished transfer");
            self.close_interrupted(subject);
        }
    }
}

/// Send side of a source maintenance task.
#[derive(Debug)]
pub struct SourceTaskReport<'a> {
    channel: &'a EventChannel,
    open: Option<(SourceId, String)>,
    problem_reported: Cell<bool>,
}

impl<'a> SourceTaskReport<'a> {
    /// Publish source task events on `channel`.
    pub fn new(channel: &'a EventChannel) -> Self {
        Self {
            channel,
            open: None,
            problem_reported: Cell::new(false),
        }
    }

    /// `task` started on `source`.
    pub fn start(&mut self, source: &SourceId, task: &str) {
        if let Some((previous, previous_task)) = self.open.take() {
            tracing::warn!(source = %previous, task = %previous_task, "task restarted without finish; closing it");
            self.close_interrupted(previous, previous_task);
        }
        emit(
            self.channel,
            &Event::SourceTaskStart {
                source: source.clone(),
                task: task.to_string(),
            },
        );
        self.open = Some((source.clone(), task.to_string()));
        self.problem_reported.set(false);
    }

    /// Progress of the open task. Returns whether to continue.
    pub fn progress(&self, value: i32) -> bool {
        emit(self.channel, &Event::SourceTaskProgress { value });
        true
    }

    /// The open task hit a problem. The returned decision is binding.
    pub fn problem(&self, outcome: OutcomeCode, description: &str) -> Decision {
        let Some((source, _)) = &self.open else {
            tracing::warn!(%outcome, "task problem without an open task");
            return Decision::Abort;
        };
        self.problem_reported.set(true);
        emit(
            self.channel,
            &Event::SourceTaskProblem {
                source: source.clone(),
                outcome,
                description: description.to_string(),
                interrupted: false,
            },
        )
        .unwrap_or(Decision::Abort)
    }

    /// The open task ended.
    pub fn finish(&mut self, outcome: OutcomeCode, reason: &str) {
        match self.open.take() {
            Some((source, task)) => self.emit_finish(source, task, outcome, reason),
            None => tracing::warn!(%outcome, "task finish without an open task"),
        }
    }

    /// Finish the task as interrupted, reporting the problem first if the
    /// engine did not.
    fn close_interrupted(&self, source: SourceId, task: String) {
        if !self.problem_reported.replace(false) {
            emit(
                self.channel,
                &Event::SourceTaskProblem {
                    source: source.clone(),
                    outcome: OutcomeCode::Unknown,
                    description: INTERRUPTED.to_string(),
                    interrupted: true,
                },
            );
        }
        self.emit_finish(source, task, OutcomeCode::Unknown, INTERRUPTED);
    }

    fn emit_finish(&self, source: SourceId, task: String, outcome: OutcomeCode, reason: &str) {
        emit(
            self.channel,
            &Event::SourceTaskFinish {
                source,
                task,
                outcome,
                reason: reason.to_string(),
            },
        );
    }
}

impl Drop for SourceTaskReport<'_> {
    fn drop(&mut self) {
        if let Some((source, task)) = self.open.take() {
            tracing::debug!(%source, %task, "closing unfinished task");
            self.close_interrupted(source, task);
        }
    }
}
