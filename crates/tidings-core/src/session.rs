//! Report Session - scoped registration of the reporters
//!
//! Opening a session connects one probe, one source task and one transfer
//! reporter to the channel. Closing it, explicitly or by dropping it on any
//! exit path, disconnects all three, so no receiver outlives the operation
//! that needed it.
//!
//! ```
//! use std::sync::Arc;
//! use tidings_core::{EventChannel, ReportSession, ui::{NullPresenter, Unattended}};
//!
//! let channel = EventChannel::new();
//! {
//!     let _session = ReportSession::open(&channel, Arc::new(NullPresenter), Some(Arc::new(Unattended)))
//!         .expect("fresh reporters are never registered yet");
//!     assert_eq!(channel.len(), 3);
//! }
//! assert!(channel.is_empty());
//! ```

use crate::channel::{EventChannel, Receiver};
use crate::error::ChannelError;
use crate::reporter::{ProbeReporter, SourceTaskReporter, TransferReporter};
use crate::ui::{Presenter, Prompter};
use std::sync::Arc;

/// Owns the reporters of one logical operation and their registrations.
///
/// Opening a second session while one is open is allowed; both narrate.
#[derive(Debug)]
pub struct ReportSession<'a> {
    channel: &'a EventChannel,
    probe: Arc<ProbeReporter>,
    task: Arc<SourceTaskReporter>,
    transfer: Arc<TransferReporter>,
    closed: bool,
}

impl<'a> ReportSession<'a> {
    /// Create the reporters and connect them to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if a registration is refused; anything
    /// already connected is disconnected again before returning.
    pub fn open(
        channel: &'a EventChannel,
        presenter: Arc<dyn Presenter>,
        prompter: Option<Arc<dyn Prompter>>,
    ) -> Result<Self, ChannelError> {
        let session = Self {
            channel,
            probe: Arc::new(ProbeReporter::new(Arc::clone(&presenter))),
            task: Arc::new(SourceTaskReporter::new(
                Arc::clone(&presenter),
                prompter.clone(),
            )),
            transfer: Arc::new(TransferReporter::new(presenter, prompter)),
            closed: false,
        };

        for receiver in session.receivers() {
            let kinds = receiver.capabilities();
            channel.connect(receiver, kinds)?;
        }
        tracing::debug!("report session opened");
        Ok(session)
    }

    /// The probe reporter owned by this session.
    pub fn probe(&self) -> &ProbeReporter {
        &self.probe
    }

    /// The source task reporter owned by this session.
    pub fn task(&self) -> &SourceTaskReporter {
        &self.task
    }

    /// The transfer reporter owned by this session.
    pub fn transfer(&self) -> &TransferReporter {
        &self.transfer
    }

    /// Disconnect every reporter. Dropping the session does the same.
    pub fn close(mut self) {
        self.disconnect_all();
    }

    fn receivers(&self) -> [Arc<dyn Receiver>; 3] {
        [
            Arc::clone(&self.probe) as Arc<dyn Receiver>,
            Arc::clone(&self.task) as Arc<dyn Receiver>,
            Arc::clone(&self.transfer) as Arc<dyn Receiver>,
        ]
    }

    fn disconnect_all(&mut self) {
        if self.closed {
            return;
        }
        for receiver in self.receivers() {
            self.channel.disconnect(&receiver);
        }
        self.closed = true;
        tracing::debug!("report session closed");
    }
}

impl Drop for ReportSession<'_> {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};
    use crate::testing::{RecordingPresenter, ScriptedPrompter};
    use crate::types::{OutcomeCode, SourceLocator};
    use crate::ui::NullPresenter;

    fn open(channel: &EventChannel) -> ReportSession<'_> {
        ReportSession::open(channel, Arc::new(NullPresenter), None).unwrap()
    }

    #[test]
    fn test_open_registers_each_kind_once() {
        let channel = EventChannel::new();
        let session = open(&channel);
        assert_eq!(channel.len(), 3);
        for kind in EventKind::ALL {
            assert_eq!(channel.receivers_for(kind), 1);
        }
        session.close();
        assert!(channel.is_empty());
    }

    #[test]
    fn test_open_close_twice_leaves_registry_empty() {
        let channel = EventChannel::new();
        open(&channel).close();
        open(&channel).close();
        assert_eq!(channel.len(), 0);
    }

    #[test]
    fn test_drop_on_early_exit_unregisters() {
        fn operation(channel: &EventChannel, fail: bool) -> Result<usize, String> {
            let _session = open(channel);
            if fail {
                return Err("engine failed".to_string());
            }
            Ok(channel.len())
        }

        let channel = EventChannel::new();
        assert_eq!(operation(&channel, false), Ok(3));
        assert!(operation(&channel, true).is_err());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_fatal_probe_still_unregisters() {
        fn probe(channel: &EventChannel) -> Result<(), crate::error::Fatal> {
            let _session = open(channel);
            channel.publish(&Event::ProbeFinish {
                locator: SourceLocator::new("http://example.org/repo"),
                outcome: OutcomeCode::InvalidFormat,
                reason: "unsupported repo type".to_string(),
            })?;
            Ok(())
        }

        let channel = EventChannel::new();
        assert!(probe(&channel).is_err());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_overlapping_sessions_both_narrate() {
        let channel = EventChannel::new();
        let first = Arc::new(RecordingPresenter::default());
        let second = Arc::new(RecordingPresenter::default());
        let a = ReportSession::open(&channel, first.clone(), None).unwrap();
        let b = ReportSession::open(&channel, second.clone(), None).unwrap();
        assert_eq!(channel.len(), 6);

        channel
            .publish(&Event::ProbeStart {
                locator: SourceLocator::new("http://example.org/repo"),
            })
            .unwrap();
        assert_eq!(first.notices().len(), 1);
        assert_eq!(second.notices().len(), 1);

        drop(a);
        assert_eq!(channel.len(), 3);
        drop(b);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_session_reporters_share_prompter() {
        let channel = EventChannel::new();
        let prompter = Arc::new(ScriptedPrompter::new(&[]));
        let shared: Arc<dyn Prompter> = prompter.clone();
        let session =
            ReportSession::open(&channel, Arc::new(NullPresenter), Some(shared)).unwrap();

        let source = crate::types::SourceId::new("oss", "http://example.org/repo");
        let decision = channel
            .publish(&Event::SourceTaskProblem {
                source,
                outcome: OutcomeCode::IoError,
                description: "timeout".to_string(),
                interrupted: false,
            })
            .unwrap();
        assert_eq!(decision, Some(crate::types::Decision::Abort));
        assert_eq!(prompter.calls(), 1);
        assert!(session.task().current().is_none());
    }
}
