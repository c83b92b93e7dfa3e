//! Lifecycle events published by the retrieval engine.
//!
//! Every event belongs to exactly one [`EventKind`]; receivers subscribe per
//! kind. Delta and patch sub-phase events belong to the transfer kind because
//! they are nested inside a resolvable download.

use crate::types::{OutcomeCode, Resolvable, SourceId, SourceLocator};
use std::fmt;

/// The capability families a receiver can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Source type detection.
    Probe,
    /// Source-level maintenance tasks (reading an index, patch data, ...).
    SourceTask,
    /// Resolvable downloads, including delta and patch sub-phases.
    Transfer,
}

impl EventKind {
    /// All kinds, in a stable order.
    pub const ALL: [Self; 3] = [Self::Probe, Self::SourceTask, Self::Transfer];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::SourceTask => write!(f, "source-task"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// A lifecycle event for an in-flight operation.
///
/// Progress values are raw: receivers clamp them into `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Type detection of a source started.
    ProbeStart {
        /// Source being probed.
        locator: SourceLocator,
    },
    /// One candidate type did not match. Informational.
    ProbeFailedVariant {
        /// Source being probed.
        locator: SourceLocator,
        /// Candidate type that was rejected.
        type_name: String,
    },
    /// The source type was detected.
    ProbeSucceeded {
        /// Source being probed.
        locator: SourceLocator,
        /// Detected type.
        type_name: String,
    },
    /// Detection progress.
    ProbeProgress {
        /// Source being probed.
        locator: SourceLocator,
        /// Raw percentage.
        value: i32,
    },
    /// Detection hit a problem. Always fatal.
    ProbeProblem {
        /// Source being probed.
        locator: SourceLocator,
        /// What went wrong.
        outcome: OutcomeCode,
        /// Human-readable description.
        description: String,
    },
    /// Detection ended.
    ProbeFinish {
        /// Source being probed.
        locator: SourceLocator,
        /// How it ended.
        outcome: OutcomeCode,
        /// Human-readable reason, empty on success.
        reason: String,
    },

    /// A source task started.
    SourceTaskStart {
        /// Source the task runs against.
        source: SourceId,
        /// Task name, e.g. "Reading patch data".
        task: String,
    },
    /// Progress of the running source task.
    SourceTaskProgress {
        /// Raw percentage.
        value: i32,
    },
    /// The source task hit a problem. Solicits a decision unless
    /// `interrupted` is set.
    SourceTaskProblem {
        /// Source the task runs against.
        source: SourceId,
        /// What went wrong.
        outcome: OutcomeCode,
        /// Human-readable description.
        description: String,
        /// Raised by the engine handle for a task left unfinished; nobody
        /// is asked.
        interrupted: bool,
    },
    /// The source task ended.
    SourceTaskFinish {
        /// Source the task ran against.
        source: SourceId,
        /// Task name.
        task: String,
        /// How it ended.
        outcome: OutcomeCode,
        /// Human-readable reason, empty on success.
        reason: String,
    },

    /// Download of a resolvable started.
    TransferStart {
        /// What is being downloaded.
        subject: Resolvable,
        /// Source it comes from.
        source: SourceLocator,
    },
    /// Download progress.
    TransferProgress {
        /// What is being downloaded.
        subject: Resolvable,
        /// Raw percentage.
        value: i32,
    },
    /// The download hit a problem. Solicits a decision unless
    /// `interrupted` is set.
    TransferProblem {
        /// What is being downloaded.
        subject: Resolvable,
        /// What went wrong.
        outcome: OutcomeCode,
        /// Human-readable description.
        description: String,
        /// Raised by the engine handle for a download left unfinished;
        /// nobody is asked.
        interrupted: bool,
    },
    /// The download ended.
    TransferFinish {
        /// What was downloaded.
        subject: Resolvable,
        /// How it ended.
        outcome: OutcomeCode,
        /// Human-readable reason, empty on success.
        reason: String,
    },

    /// Delta download started. `size` is 0 when unknown.
    DeltaDownloadStart {
        /// Path of the delta below the source.
        path: String,
        /// Expected download size in bytes.
        size: u64,
    },
    /// Delta download progress.
    DeltaDownloadProgress {
        /// Raw percentage.
        value: i32,
    },
    /// Delta download problem. Informational.
    DeltaDownloadProblem {
        /// Human-readable description.
        description: String,
    },
    /// Delta download ended.
    DeltaDownloadFinish,

    /// Delta application started.
    DeltaApplyStart {
        /// Local path of the downloaded delta.
        path: String,
    },
    /// Delta application progress. Not interruptible.
    DeltaApplyProgress {
        /// Raw percentage.
        value: i32,
    },
    /// Delta application problem. Informational.
    DeltaApplyProblem {
        /// Human-readable description.
        description: String,
    },
    /// Delta application ended.
    DeltaApplyFinish,

    /// Patch package download started. `size` is 0 when unknown.
    PatchDownloadStart {
        /// Path of the patch package below the source.
        path: String,
        /// Expected download size in bytes.
        size: u64,
    },
    /// Patch package download progress.
    PatchDownloadProgress {
        /// Raw percentage.
        value: i32,
    },
    /// Patch package download problem. Informational.
    PatchDownloadProblem {
        /// Human-readable description.
        description: String,
    },
    /// Patch package download ended.
    PatchDownloadFinish,
}

impl Event {
    /// The capability family this event is dispatched under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ProbeStart { .. }
            | Self::ProbeFailedVariant { .. }
            | Self::ProbeSucceeded { .. }
            | Self::ProbeProgress { .. }
            | Self::ProbeProblem { .. }
            | Self::ProbeFinish { .. } => EventKind::Probe,
            Self::SourceTaskStart { .. }
            | Self::SourceTaskProgress { .. }
            | Self::SourceTaskProblem { .. }
            | Self::SourceTaskFinish { .. } => EventKind::SourceTask,
            _ => EventKind::Transfer,
        }
    }

    /// Whether dispatch of this event asks receivers for a [`Decision`].
    ///
    /// Only the primary transfer and source task problems are decision-bearing,
    /// and only when they were not raised for an interrupted subject. Probe
    /// problems are fatal and sub-phase problems are informational.
    ///
    /// [`Decision`]: crate::types::Decision
    pub fn is_decision_bearing(&self) -> bool {
        matches!(
            self,
            Self::TransferProblem {
                interrupted: false,
                ..
            } | Self::SourceTaskProblem {
                interrupted: false,
                ..
            }
        )
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProbeStart { .. } => "probe.start",
            Self::ProbeFailedVariant { .. } => "probe.failed_variant",
            Self::ProbeSucceeded { .. } => "probe.succeeded",
            Self::ProbeProgress { .. } => "probe.progress",
            Self::ProbeProblem { .. } => "probe.problem",
            Self::ProbeFinish { .. } => "probe.finish",
            Self::SourceTaskStart { .. } => "task.start",
            Self::SourceTaskProgress { .. } => "task.progress",
            Self::SourceTaskProblem { .. } => "task.problem",
            Self::SourceTaskFinish { .. } => "task.finish",
            Self::TransferStart { .. } => "transfer.start",
            Self::TransferProgress { .. } => "transfer.progress",
            Self::TransferProblem { .. } => "transfer.problem",
            Self::TransferFinish { .. } => "transfer.finish",
            Self::DeltaDownloadStart { .. } => "delta_download.start",
            Self::DeltaDownloadProgress { .. } => "delta_download.progress",
            Self::DeltaDownloadProblem { .. } => "delta_download.problem",
            Self::DeltaDownloadFinish => "delta_download.finish",
            Self::DeltaApplyStart { .. } => "delta_apply.start",
            Self::DeltaApplyProgress { .. } => "delta_apply.progress",
            Self::DeltaApplyProblem { .. } => "delta_apply.problem",
            Self::DeltaApplyFinish => "delta_apply.finish",
            Self::PatchDownloadStart { .. } => "patch_download.start",
            Self::PatchDownloadProgress { .. } => "patch_download.progress",
            Self::PatchDownloadProblem { .. } => "patch_download.problem",
            Self::PatchDownloadFinish => "patch_download.finish",
        }
    }
}
