//! Receivers that turn lifecycle events into console narration and decisions.
//!
//! | Reporter | Kind | Problem handling |
//! |----------|------|------------------|
//! | [`ProbeReporter`] | probe | fatal, never asks |
//! | [`SourceTaskReporter`] | source task | asks, defaults to abort |
//! | [`TransferReporter`] | transfer | asks for the primary subject, informational for delta/patch |

mod probe;
mod task;
mod transfer;

pub use probe::{ProbeReporter, ProbeState};
pub use task::SourceTaskReporter;
pub use transfer::{SubjectState, TransferReporter};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock reporter state, recovering from poisoning: a reporter must keep
/// narrating even if an earlier callback panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
