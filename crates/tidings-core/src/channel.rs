//! Event Channel - fan-out of lifecycle events to registered receivers
//!
//! The channel is an explicitly owned value handed by reference to whoever
//! publishes or subscribes; there is no process-wide registry.
//!
//! # Dispatch rules
//!
//! - Receivers are consulted in registration order.
//! - Every receiver registered for the event's kind sees non-problem events.
//! - For decision-bearing events the first receiver that answers wins and
//!   the remaining receivers are not consulted (single responder).
//! - A [`Fatal`] returned by a receiver stops dispatch and is handed back to
//!   the publisher.
//!
//! Dispatch runs on the caller's thread and may block for as long as a
//! receiver waits on the user. The registry lock is released before any
//! receiver runs, so a session may disconnect while a dispatch is in flight.
//! Re-entrant publishing of the same kind from inside a receiver is not
//! guaranteed to be meaningful and should be avoided.

use crate::error::{ChannelError, Fatal};
use crate::event::{Event, EventKind};
use crate::types::Decision;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Something that observes events of one or more kinds.
pub trait Receiver: Send + Sync {
    /// The kinds this receiver knows how to handle.
    fn capabilities(&self) -> &'static [EventKind];

    /// Handle one event.
    ///
    /// Return `Ok(Some(decision))` to answer a decision-bearing event,
    /// `Ok(None)` to just observe.
    ///
    /// # Errors
    ///
    /// Returns [`Fatal`] when the event makes the whole operation
    /// unrecoverable.
    fn receive(&self, event: &Event) -> Result<Option<Decision>, Fatal>;
}

struct Registration {
    receiver: Arc<dyn Receiver>,
    kinds: Vec<EventKind>,
}

/// Registry of active receivers plus synchronous dispatch.
#[derive(Default)]
pub struct EventChannel {
    registry: RwLock<Vec<Registration>>,
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("receivers", &self.len())
            .finish_non_exhaustive()
    }
}

fn same_instance(a: &Arc<dyn Receiver>, b: &Arc<dyn Receiver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl EventChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `receiver` for `kinds`.
    ///
    /// Connecting an already-registered instance for additional, disjoint
    /// kinds extends its registration in place (it keeps its dispatch
    /// position).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::AlreadyRegistered`] if the same instance is
    /// already connected for any of `kinds`.
    pub fn connect(
        &self,
        receiver: Arc<dyn Receiver>,
        kinds: &[EventKind],
    ) -> Result<(), ChannelError> {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = registry
            .iter_mut()
            .find(|r| same_instance(&r.receiver, &receiver))
        {
            if let Some(kind) = kinds.iter().find(|k| existing.kinds.contains(k)) {
                return Err(ChannelError::AlreadyRegistered { kind: *kind });
            }
            existing.kinds.extend_from_slice(kinds);
            tracing::debug!(?kinds, "extended receiver registration");
            return Ok(());
        }

        let mut own_kinds = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !own_kinds.contains(kind) {
                own_kinds.push(*kind);
            }
        }
        registry.push(Registration {
            receiver,
            kinds: own_kinds,
        });
        tracing::debug!(?kinds, total = registry.len(), "receiver connected");
        Ok(())
    }

    /// Remove `receiver` from every kind. A no-op if it is not registered.
    pub fn disconnect(&self, receiver: &Arc<dyn Receiver>) {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registry.len();
        registry.retain(|r| !same_instance(&r.receiver, receiver));
        if registry.len() < before {
            tracing::debug!(total = registry.len(), "receiver disconnected");
        }
    }

    /// Whether `receiver` is currently registered for any kind.
    pub fn is_connected(&self, receiver: &Arc<dyn Receiver>) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|r| same_instance(&r.receiver, receiver))
    }

    /// Number of registered receivers.
    pub fn len(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when no receiver is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of receivers registered for `kind`.
    pub fn receivers_for(&self, kind: EventKind) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kinds.contains(&kind))
            .count()
    }

    /// Dispatch `event` to every receiver registered for its kind.
    ///
    /// Returns the decision of the first responder for decision-bearing
    /// events, `None` when nobody answered or the event carries no decision.
    ///
    /// # Errors
    ///
    /// Returns the [`Fatal`] signal raised by a receiver; receivers after it
    /// are not consulted.
    pub fn publish(&self, event: &Event) -> Result<Option<Decision>, Fatal> {
        let kind = event.kind();
        let targets: Vec<Arc<dyn Receiver>> = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kinds.contains(&kind))
            .map(|r| Arc::clone(&r.receiver))
            .collect();

        tracing::debug!(event = event.name(), receivers = targets.len(), "dispatch");

        for receiver in targets {
            match receiver.receive(event)? {
                Some(decision) if event.is_decision_bearing() => {
                    tracing::debug!(event = event.name(), %decision, "decision received");
                    return Ok(Some(decision));
                }
                Some(decision) => {
                    tracing::warn!(
                        event = event.name(),
                        %decision,
                        "decision returned for an event that does not carry one; ignored"
                    );
                }
                None => {}
            }
        }
        Ok(None)
    }
}
