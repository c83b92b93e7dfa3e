//! tidings-core - progress and decision reporting for package retrieval
//!
//! Long-running retrieval operations (probing a source's type, downloading a
//! package, downloading and applying a delta, downloading a patch package)
//! publish lifecycle events; reporters turn them into console narration and,
//! when something fails, into a binding [`Decision`].
//!
//! # Architecture
//!
//! ```text
//! engine ──► report::{ProbeReport, TransferReport, SourceTaskReport}
//!                 │ publish(Event)
//!                 ▼
//!           EventChannel ──► reporters (registered by a ReportSession)
//!                 ▲                │ render / prompt
//!                 └── Decision ◄───┘
//! ```
//!
//! - **Explicit channel**: the receiver registry is an owned [`EventChannel`]
//!   passed by reference, never process-wide state.
//! - **Scoped registration**: a [`ReportSession`] connects its reporters on
//!   open and disconnects them on close or drop.
//! - **No process exit**: a failed probe yields a [`Fatal`] value that travels
//!   back to the host, which picks the termination policy.

pub mod channel;
pub mod error;
pub mod event;
pub mod progress;
pub mod report;
pub mod reporter;
pub mod session;
pub mod testing;
pub mod types;
pub mod ui;

pub use channel::{EventChannel, Receiver};
pub use error::{ChannelError, Fatal};
pub use event::{Event, EventKind};
pub use report::{ProbeReport, SourceTaskReport, TransferReport};
pub use reporter::{ProbeReporter, SourceTaskReporter, TransferReporter};
pub use session::ReportSession;
pub use types::{Decision, OutcomeCode, Resolvable, ResolvableKind, SourceId, SourceLocator};
pub use ui::{Presenter, Prompter};
