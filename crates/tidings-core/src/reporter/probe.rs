//! Source type detection narration.
//!
//! Probing has no partial state worth resuming, so any problem or failed
//! finish is [`Fatal`]: the reporter renders it and hands the signal back
//! to the host instead of asking anyone.

use super::lock;
use crate::channel::Receiver;
use crate::error::Fatal;
use crate::event::{Event, EventKind};
use crate::types::{Decision, OutcomeCode, SourceLocator};
use crate::ui::Presenter;
use std::sync::{Arc, Mutex};

/// Where the reporter is in the detection of one source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeState {
    /// Nothing is being probed.
    #[default]
    Idle,
    /// Candidate types are being tried.
    Probing {
        /// Source being probed.
        locator: SourceLocator,
    },
    /// The type was detected.
    Succeeded {
        /// Source that was probed.
        locator: SourceLocator,
        /// Detected type.
        type_name: String,
    },
    /// Detection failed fatally.
    Aborted {
        /// Source that was probed.
        locator: SourceLocator,
    },
}

/// Receiver for [`EventKind::Probe`] events.
pub struct ProbeReporter {
    presenter: Arc<dyn Presenter>,
    state: Mutex<ProbeState>,
}

impl std::fmt::Debug for ProbeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeReporter")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ProbeReporter {
    /// Create an idle reporter.
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        Self {
            presenter,
            state: Mutex::new(ProbeState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> ProbeState {
        lock(&self.state).clone()
    }

    /// Detection of `locator` started.
    pub fn start(&self, locator: &SourceLocator) {
        *lock(&self.state) = ProbeState::Probing {
            locator: locator.clone(),
        };
        self.presenter
            .notice(&format!("Determining {locator} source type..."));
    }

    /// A candidate type did not match. Not an error.
    pub fn failed_candidate(&self, type_name: &str) {
        self.presenter.notice(&format!(".. not {type_name}"));
    }

    /// The source was recognised as `type_name`.
    pub fn succeeded(&self, locator: &SourceLocator, type_name: &str) {
        *lock(&self.state) = ProbeState::Succeeded {
            locator: locator.clone(),
            type_name: type_name.to_string(),
        };
        self.presenter
            .notice(&format!("{locator} is type {type_name}"));
    }

    /// Detection progress. Probing is never cancelled from here.
    pub fn progress(&self, value: i32) -> bool {
        tracing::trace!(value, "probe progress");
        true
    }

    /// Detection failed. Always fatal; implies [`Decision::Abort`].
    pub fn problem(
        &self,
        locator: &SourceLocator,
        outcome: OutcomeCode,
        description: &str,
    ) -> Fatal {
        *lock(&self.state) = ProbeState::Aborted {
            locator: locator.clone(),
        };
        self.presenter.render_done();
        self.presenter.render_error(outcome, description);
        tracing::error!(%locator, %outcome, "source probe problem");
        Fatal::new(locator.clone(), outcome, description)
    }

    /// Detection ended.
    ///
    /// # Errors
    ///
    /// Returns [`Fatal`] when `outcome` is not [`OutcomeCode::Ok`].
    pub fn finish(
        &self,
        locator: &SourceLocator,
        outcome: OutcomeCode,
        reason: &str,
    ) -> Result<(), Fatal> {
        if outcome.is_ok() {
            let mut state = lock(&self.state);
            if matches!(*state, ProbeState::Probing { .. }) {
                tracing::warn!(%locator, "probe finished without a detected type");
                *state = ProbeState::Idle;
            }
            return Ok(());
        }

        *lock(&self.state) = ProbeState::Aborted {
            locator: locator.clone(),
        };
        self.presenter.render_error(outcome, reason);
        tracing::error!(%locator, %outcome, "source probe failed");
        Err(Fatal::new(locator.clone(), outcome, reason))
    }
}

impl Receiver for ProbeReporter {
    fn capabilities(&self) -> &'static [EventKind] {
        &[EventKind::Probe]
    }

    fn receive(&self, event: &Event) -> Result<Option<Decision>, Fatal> {
        match event {
            Event::ProbeStart { locator } => self.start(locator),
            Event::ProbeFailedVariant { type_name, .. } => self.failed_candidate(type_name),
            Event::ProbeSucceeded { locator, type_name } => self.succeeded(locator, type_name),
            Event::ProbeProgress { value, .. } => {
                self.progress(*value);
            }
            Event::ProbeProblem {
                locator,
                outcome,
                description,
            } => return Err(self.problem(locator, *outcome, description)),
            Event::ProbeFinish {
                locator,
                outcome,
                reason,
            } => self.finish(locator, *outcome, reason)?,
            _ => {}
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPresenter, Rendered};

    fn url() -> SourceLocator {
        SourceLocator::new("http://download.example.org/oss")
    }

    #[test]
    fn test_probe_narration() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = ProbeReporter::new(presenter.clone());

        reporter.start(&url());
        assert_eq!(reporter.state(), ProbeState::Probing { locator: url() });
        reporter.failed_candidate("yast2");
        reporter.failed_candidate("plaindir");
        reporter.succeeded(&url(), "rpm-md");
        reporter.finish(&url(), OutcomeCode::Ok, "").unwrap();

        assert_eq!(
            presenter.notices(),
            vec![
                "Determining http://download.example.org/oss source type...".to_string(),
                ".. not yast2".to_string(),
                ".. not plaindir".to_string(),
                "http://download.example.org/oss is type rpm-md".to_string(),
            ]
        );
        assert!(matches!(reporter.state(), ProbeState::Succeeded { .. }));
    }

    #[test]
    fn test_failed_finish_is_fatal() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = ProbeReporter::new(presenter.clone());

        reporter.start(&url());
        let fatal = reporter
            .finish(&url(), OutcomeCode::InvalidFormat, "unsupported repo type")
            .unwrap_err();

        assert_eq!(fatal.reason, "unsupported repo type");
        assert_eq!(reporter.state(), ProbeState::Aborted { locator: url() });
        assert!(presenter.rendered().contains(&Rendered::Error(
            OutcomeCode::InvalidFormat,
            "unsupported repo type".to_string()
        )));
    }

    #[test]
    fn test_problem_is_fatal_through_receiver() {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = ProbeReporter::new(presenter.clone());

        let result = reporter.receive(&Event::ProbeProblem {
            locator: url(),
            outcome: OutcomeCode::NotFound,
            description: "no such host".to_string(),
        });
        let fatal = result.unwrap_err();
        assert_eq!(fatal.outcome, OutcomeCode::NotFound);
        assert_eq!(
            presenter.rendered(),
            vec![
                Rendered::Done,
                Rendered::Error(OutcomeCode::NotFound, "no such host".to_string())
            ]
        );
    }

    #[test]
    fn test_progress_always_continues() {
        let reporter = ProbeReporter::new(Arc::new(crate::ui::NullPresenter));
        assert!(reporter.progress(50));
        assert!(reporter.progress(-3));
    }
}
