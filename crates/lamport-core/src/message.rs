//! Messages exchanged between processes.

use std::fmt;
use std::sync::Arc;

use crate::id::ProcessId;

/// Opaque message body.
///
/// The ordering logic never looks inside. Shared via `Arc` so that
/// cloning a message for logging or replies does not copy the bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    /// An empty payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The bytes as UTF-8, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Payload({s:?})"),
            None => write!(f, "Payload({} bytes)", self.0.len()),
        }
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Self(Arc::from(v.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Self(Arc::from(v.into_bytes()))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self(Arc::from(v))
    }
}

impl From<&[u8]> for Payload {
    fn from(v: &[u8]) -> Self {
        Self(Arc::from(v))
    }
}

/// A message in flight between two processes.
///
/// `counter` is the sender's clock value right after the send event was
/// stamped; the receiver merges against it. Fields are read-only once
/// built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    sender: ProcessId,
    receiver: ProcessId,
    counter: u64,
    payload: Payload,
}

impl Message {
    /// Build a message carrying the sender's post-send counter.
    pub fn new(sender: ProcessId, receiver: ProcessId, counter: u64, payload: Payload) -> Self {
        Self {
            sender,
            receiver,
            counter,
            payload,
        }
    }

    /// The sending process.
    pub fn sender(&self) -> &ProcessId {
        &self.sender
    }

    /// The receiving process.
    pub fn receiver(&self) -> &ProcessId {
        &self.receiver
    }

    /// The sender's timestamp at the moment of sending.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// The opaque body.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}
