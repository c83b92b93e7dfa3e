//! Error and termination signals of the reporting layer

use crate::event::EventKind;
use crate::types::{Decision, OutcomeCode, SourceLocator};
use thiserror::Error;

/// Registration failures on the [`EventChannel`](crate::channel::EventChannel).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The same receiver instance is already connected for this kind.
    #[error("receiver already registered for {kind} events")]
    AlreadyRegistered {
        /// First overlapping kind found.
        kind: EventKind,
    },
}

/// Source type detection failed; the whole operation must stop.
///
/// This replaces an in-place process exit: it travels back through
/// `publish` to the host, which chooses the termination policy. No retry is
/// ever offered for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot determine type of {locator}: {reason}")]
pub struct Fatal {
    /// Source whose probe failed.
    pub locator: SourceLocator,
    /// Outcome reported by the engine.
    pub outcome: OutcomeCode,
    /// Reason or problem description as reported.
    pub reason: String,
}

impl Fatal {
    /// Create a fatal probe signal.
    pub fn new(locator: SourceLocator, outcome: OutcomeCode, reason: &str) -> Self {
        Self {
            locator,
            outcome,
            reason: reason.to_string(),
        }
    }

    /// The decision this signal implies for the engine.
    pub fn decision(&self) -> Decision {
        Decision::Abort
    }
}
