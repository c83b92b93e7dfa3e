//! Source maintenance task narration (reading an index, patch data, ...).

use super::lock;
use crate::channel::Receiver;
use crate::error::Fatal;
use crate::event::{Event, EventKind};
use crate::progress::ProgressTracker;
use crate::types::{Decision, OutcomeCode, SourceId};
use crate::ui::{Presenter, Prompter};
use std::sync::{Arc, Mutex};

/// Tasks with this prefix run in large numbers; their completion only
/// resets the line instead of printing a "done" line each time.
const QUIET_TASK_PREFIX: &str = "Reading patch";

#[derive(Debug, Default)]
struct TaskInner {
    current: Option<(SourceId, String)>,
    progress: ProgressTracker,
}

/// Receiver for [`EventKind::SourceTask`] events.
pub struct SourceTaskReporter {
    presenter: Arc<dyn Presenter>,
    prompter: Option<Arc<dyn Prompter>>,
    inner: Mutex<TaskInner>,
}

impl std::fmt::Debug for SourceTaskReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTaskReporter")
            .field("inner", &*lock(&self.inner))
            .finish_non_exhaustive()
    }
}

fn label(source: &SourceId, task: &str) -> String {
    format!("({}) {task}", source.alias)
}

impl SourceTaskReporter {
    /// Create a reporter. Without a prompter every problem resolves to abort.
    pub fn new(presenter: Arc<dyn Presenter>, prompter: Option<Arc<dyn Prompter>>) -> Self {
        Self {
            presenter,
            prompter,
            inner: Mutex::new(TaskInner::default()),
        }
    }

    /// The task in flight, if any.
    pub fn current(&self) -> Option<(SourceId, String)> {
        lock(&self.inner).current.clone()
    }

    /// `task` started on `source`; shows it at 0%.
    pub fn start(&self, source: &SourceId, task: &str) {
        let percent = {
            let mut inner = lock(&self.inner);
            inner.current = Some((source.clone(), task.to_string()));
            inner.progress.reset();
            inner.progress.advance(0)
        };
        self.presenter.render_progress(&label(source, task), percent);
    }

    /// Progress of the running task.
    pub fn progress(&self, value: i32) -> bool {
        let step = {
            let mut inner = lock(&self.inner);
            match inner.current.clone() {
                Some((source, task)) => Some((label(&source, &task), inner.progress.advance(value))),
                None => {
                    tracing::warn!(value, "task progress without a running task; rejected");
                    None
                }
            }
        };
        if let Some((text, percent)) = step {
            self.presenter.render_progress(&text, percent);
        }
        true
    }

    /// The task failed; ask what to do, aborting if nobody can answer.
    pub fn problem(&self, source: &SourceId, outcome: OutcomeCode, description: &str) -> Decision {
        self.presenter.render_done();
        self.presenter.render_error(outcome, description);
        let decision = self
            .prompter
            .as_ref()
            .map_or(Decision::Abort, |p| p.prompt_decision(Decision::Abort));
        tracing::info!(source = %source, %outcome, %decision, "task problem resolved");
        decision
    }

    /// The engine left the task on `source` unfinished. Nobody is asked;
    /// the following finish prints the outcome.
    pub fn interrupted(&self, source: &SourceId, outcome: OutcomeCode, description: &str) {
        tracing::debug!(source = %source, %outcome, description, "task interrupted");
    }

    /// The task ended: shows 100%, then a completion line (or just a line
    /// reset for "Reading patch..." tasks), then the reason if it failed.
    pub fn finish(&self, source: &SourceId, task: &str, outcome: OutcomeCode, reason: &str) {
        let (text, percent) = {
            let mut inner = lock(&self.inner);
            let text = match inner.current.take() {
                Some((current_source, current_task)) => label(&current_source, &current_task),
                None => {
                    tracing::warn!(%source, task, "finish for a task that was not started");
                    inner.progress.reset();
                    label(source, task)
                }
            };
            (text, inner.progress.advance(100))
        };

        self.presenter.render_progress(&text, percent);
        if task.starts_with(QUIET_TASK_PREFIX) {
            self.presenter.line_reset();
        } else {
            self.presenter.render_done();
        }
        if !outcome.is_ok() {
            self.presenter.render_error(outcome, reason);
        }
    }
}

impl Receiver for SourceTaskReporter {
    fn capabilities(&self) -> &'static [EventKind] {
        &[EventKind::SourceTask]
    }

    fn receive(&self, event: &Event) -> Result<Option<Decision>, Fatal> {
        match event {
            Event::SourceTaskStart { source, task } => self.start(source, task),
            Event::SourceTaskProgress { value } => {
                self.progress(*value);
            }
            Event::SourceTaskProblem {
                source,
                outcome,
                description,
                interrupted: false,
            } => return Ok(Some(self.problem(source, *outcome, description))),
            Event::SourceTaskProblem {
                source,
                outcome,
                description,
                interrupted: true,
            } => self.interrupted(source, *outcome, description),
            Event::SourceTaskFinish {
                source,
                task,
                outcome,
                reason,
            } => self.finish(source, task, *outcome, reason),
            _ => {}
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPresenter, Rendered, ScriptedPrompter};

    fn oss() -> SourceId {
        SourceId::new("oss", "http://download.example.org/oss")
    }

    #[test]
    fn test_messages_are_prefixed_with_alias() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = SourceTaskReporter::new(presenter.clone(), None);

        reporter.start(&oss(), "Reading index");
        reporter.progress(40);
        reporter.finish(&oss(), "Reading index", OutcomeCode::Ok, "");

        assert_eq!(
            presenter.rendered(),
            vec![
                Rendered::Progress("(oss) Reading index".to_string(), 0),
                Rendered::Progress("(oss) Reading index".to_string(), 40),
                Rendered::Progress("(oss) Reading index".to_string(), 100),
                Rendered::Done,
            ]
        );
        assert_eq!(reporter.current(), None);
    }

    #[test]
    fn test_reading_patch_resets_line_instead_of_done() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = SourceTaskReporter::new(presenter.clone(), None);

        reporter.start(&oss(), "Reading patch data");
        reporter.finish(&oss(), "Reading patch data", OutcomeCode::Ok, "");

        let rendered = presenter.rendered();
        assert_eq!(
            rendered[rendered.len() - 2..],
            [
                Rendered::Progress("(oss) Reading patch data".to_string(), 100),
                Rendered::LineReset,
            ]
        );
        assert_eq!(presenter.count_done(), 0);
    }

    #[test]
    fn test_failed_finish_prints_reason_after_completion() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = SourceTaskReporter::new(presenter.clone(), None);

        reporter.start(&oss(), "Reading index");
        reporter.finish(&oss(), "Reading index", OutcomeCode::InvalidFormat, "bad xml");

        let rendered = presenter.rendered();
        assert_eq!(
            rendered[rendered.len() - 2..],
            [
                Rendered::Done,
                Rendered::Error(OutcomeCode::InvalidFormat, "bad xml".to_string()),
            ]
        );
    }

    #[test]
    fn test_problem_defaults_to_abort_without_prompter() {
        let reporter = SourceTaskReporter::new(Arc::new(RecordingPresenter::default()), None);
        reporter.start(&oss(), "Reading index");
        assert_eq!(
            reporter.problem(&oss(), OutcomeCode::IoError, "timeout"),
            Decision::Abort
        );
    }

    #[test]
    fn test_problem_asks_prompter() {
        let presenter = Arc::new(RecordingPresenter::default());
        let prompter = Arc::new(ScriptedPrompter::new(&[Decision::Retry]));
        let shared: Arc<dyn Prompter> = prompter.clone();
        let reporter = SourceTaskReporter::new(presenter.clone(), Some(shared));

        reporter.start(&oss(), "Reading index");
        let decision = reporter.problem(&oss(), OutcomeCode::IoError, "timeout");
        assert_eq!(decision, Decision::Retry);
        assert_eq!(prompter.calls(), 1);
        assert_eq!(prompter.defaults_offered(), vec![Decision::Abort]);
    }

    #[test]
    fn test_progress_without_task_is_rejected() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = SourceTaskReporter::new(presenter.clone(), None);
        assert!(reporter.progress(50));
        assert!(presenter.rendered().is_empty());
    }
}
