//! Platform events delivered to the session manager.
//!
//! Backends never call into the session manager directly. They push
//! [`LinkEvent`]s onto an unbounded channel and the task that owns the
//! session drains it, so all session state is mutated from one place.

use tokio::sync::mpsc;

/// Identifies one connect attempt.
///
/// Events are stamped with the generation of the session that produced them
/// so the manager can ignore stragglers from a discarded session.
pub type SessionGeneration = u64;

/// Events pushed by a peripheral backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A characteristic value arrived, either pushed or read on demand.
    Value {
        /// Session the value belongs to.
        generation: SessionGeneration,
        /// Raw characteristic bytes.
        data: Vec<u8>,
    },
    /// The connection went away, for whatever reason.
    SessionLost {
        /// Session that was lost.
        generation: SessionGeneration,
    },
}

impl LinkEvent {
    /// Generation the event is stamped with.
    pub fn generation(&self) -> SessionGeneration {
        match self {
            LinkEvent::Value { generation, .. } | LinkEvent::SessionLost { generation } => {
                *generation
            }
        }
    }
}

/// Sender half handed to backends.
pub type EventSender = mpsc::UnboundedSender<LinkEvent>;

/// Receiver half drained by the session owner.
pub type EventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

/// Create a new event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A sender bound to one session generation.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    generation: SessionGeneration,
    sender: EventSender,
}

impl SessionEvents {
    /// Bind `sender` to `generation`.
    pub fn new(generation: SessionGeneration, sender: EventSender) -> Self {
        Self { generation, sender }
    }

    /// Generation this sender stamps.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// Deliver a characteristic value.
    pub fn value(&self, data: Vec<u8>) {
        // Receiver gone means the session owner is shutting down.
        let _ = self.sender.send(LinkEvent::Value {
            generation: self.generation,
            data,
        });
    }

    /// Report that the session was lost.
    pub fn session_lost(&self) {
        let _ = self.sender.send(LinkEvent::SessionLost {
            generation: self.generation,
        });
    }
}
