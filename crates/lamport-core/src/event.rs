//! Immutable event records.

use std::fmt;

use crate::clock::LamportClock;
use crate::id::ProcessId;

/// What happened at an event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventLabel {
    /// A local step with a caller-chosen name.
    Internal(String),
    /// A message handed off to `to`.
    Sent {
        /// Receiver of the message.
        to: ProcessId,
    },
    /// A message from `from` was applied.
    Received {
        /// Sender of the message.
        from: ProcessId,
    },
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(name) => f.write_str(name),
            Self::Sent { to } => write!(f, "sent to {to}"),
            Self::Received { from } => write!(f, "received from {from}"),
        }
    }
}

/// A label and the clock snapshot taken when it occurred.
///
/// Has no mutators. The owner is the clock's owner, so an event cannot
/// claim a different process than the one that stamped it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    label: EventLabel,
    clock: LamportClock,
}

impl Event {
    /// Create an event stamped with `clock`.
    pub fn new(label: EventLabel, clock: LamportClock) -> Self {
        Self { label, clock }
    }

    /// The event's logical timestamp.
    #[inline]
    pub fn counter(&self) -> u64 {
        self.clock.value()
    }

    /// The process that recorded the event.
    #[inline]
    pub fn owner(&self) -> &ProcessId {
        self.clock.owner()
    }

    /// What happened.
    pub fn label(&self) -> &EventLabel {
        &self.label
    }

    /// The full clock snapshot.
    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.clock, self.label)
    }
}
