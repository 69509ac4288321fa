//! Identity-to-mailbox mapping shared by the processes of one system.
//!
//! The [`Directory`] holds the only `Sender` for every live mailbox.
//! Senders hand off with `try_send` while holding the read lock and
//! never wait under it, so registration is never held up by a full
//! mailbox. A retiring process removes itself under the write lock.
//! Once the removal succeeds no hand-off can be in progress, so the
//! retiring process can drain its mailbox knowing nothing more will
//! arrive.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, TryLockError};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use lamport_core::{Message, ProcessId};

use crate::config::ConfigError;

/// Create a mailbox channel with the configured capacity.
pub(crate) fn mailbox(capacity: Option<usize>) -> (Sender<Message>, Receiver<Message>) {
    match capacity {
        Some(n) => crossbeam_channel::bounded(n),
        None => crossbeam_channel::unbounded(),
    }
}

/// Live mailboxes, keyed by process identity in registration order.
#[derive(Default)]
pub(crate) struct Directory {
    mailboxes: RwLock<IndexMap<ProcessId, Sender<Message>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mailbox. Fails if the identity is already live.
    pub fn register(&self, id: ProcessId, tx: Sender<Message>) -> Result<(), ConfigError> {
        let mut map = self
            .mailboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&id) {
            return Err(ConfigError::DuplicateProcess { id });
        }
        map.insert(id, tx);
        Ok(())
    }

    /// Run `f` with `to`'s mailbox while holding the read lock.
    ///
    /// Returns `None` if `to` is not registered.
    pub fn with_mailbox<R>(&self, to: &ProcessId, f: impl FnOnce(&Sender<Message>) -> R) -> Option<R> {
        let map = self.mailboxes.read().unwrap_or_else(PoisonError::into_inner);
        map.get(to).map(f)
    }

    /// Remove `id` without blocking. Returns `false` if a hand-off holds
    /// the read lock; the caller drains its mailbox and retries.
    pub fn try_remove(&self, id: &ProcessId) -> bool {
        let mut map = match self.mailboxes.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        map.shift_remove(id);
        true
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: &ProcessId) -> bool {
        self.mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered identities, in registration order.
    pub fn ids(&self) -> Vec<ProcessId> {
        self.mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

// ── Counters ─────────────────────────────────────────────────────

/// System-wide counters updated lock-free by every process thread.
///
/// `tasks_running` and `in_flight` drive quiescence detection: the system
/// is quiet once both are zero.
#[derive(Default)]
pub(crate) struct Counters {
    tasks_running: AtomicUsize,
    in_flight: AtomicUsize,
    messages_sent: AtomicU64,
    messages_delivered: AtomicU64,
    messages_lost: AtomicU64,
    events_recorded: AtomicU64,
}

// Compile-time assertion: Counters must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Counters>();
    assert::<Directory>();
};

impl Counters {
    pub fn task_started(&self) {
        self.tasks_running.fetch_add(1, Ordering::AcqRel);
    }

    pub fn task_finished(&self) {
        self.tasks_running.fetch_sub(1, Ordering::AcqRel);
    }

    /// Called before the hand-off, so `in_flight` never under-counts.
    pub fn message_sent(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// The hand-off failed after `message_sent`.
    pub fn message_bounced(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.messages_sent.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// A message was discarded by a process that is unwinding.
    pub fn message_lost(&self) {
        self.messages_lost.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn event_recorded(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// No task is running and no message is waiting to be applied.
    pub fn is_quiet(&self) -> bool {
        self.tasks_running.load(Ordering::Acquire) == 0
            && self.in_flight.load(Ordering::Acquire) == 0
    }

    pub fn snapshot(&self) -> SystemStats {
        SystemStats {
            tasks_running: self.tasks_running.load(Ordering::Acquire),
            in_flight: self.in_flight.load(Ordering::Acquire),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_lost: self.messages_lost.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the system counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemStats {
    /// Tasks that have started and not yet returned.
    pub tasks_running: usize,
    /// Messages handed off and not yet applied by their receiver.
    pub in_flight: usize,
    /// Messages successfully handed off.
    pub messages_sent: u64,
    /// Messages applied by their receiver.
    pub messages_delivered: u64,
    /// Messages discarded because the receiver panicked.
    pub messages_lost: u64,
    /// Events appended to any log.
    pub events_recorded: u64,
}
