//! Error types for the Lamport simulation framework.
//!
//! Split by severity: [`ProcessError`] is local and recoverable,
//! [`InvariantViolation`] means the causal-ordering guarantee is already
//! broken and the owning process must abort.

use thiserror::Error;

use crate::id::ProcessId;

/// Recoverable errors from a single process operation.
///
/// Local to the operation that produced them: no other process's clock
/// or log is affected, and nothing is retried automatically.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The send target was never started or has already terminated.
    #[error("unknown recipient '{to}'")]
    UnknownRecipient {
        /// The identity the message was addressed to.
        to: ProcessId,
    },
    /// The process has finished (or was stopped) and accepts no actions.
    #[error("process '{id}' has terminated")]
    ProcessTerminated {
        /// The terminated process.
        id: ProcessId,
    },
}

/// A broken clock or log invariant inside a process.
///
/// Never returned to task code as a recoverable condition: the process
/// thread panics with it, since continuing would publish events whose
/// timestamps no longer respect happens-before.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The clock counter went backwards.
    #[error("clock of '{owner}' regressed from {previous} to {observed}")]
    ClockRegressed {
        /// Owner of the clock.
        owner: ProcessId,
        /// Counter before the update.
        previous: u64,
        /// Counter after the update.
        observed: u64,
    },
    /// A new event did not have a strictly larger counter than the last one.
    #[error("log of '{owner}' not strictly increasing: {last} then {next}")]
    NonIncreasingLog {
        /// Owner of the log.
        owner: ProcessId,
        /// Counter of the previous logged event.
        last: u64,
        /// Counter of the rejected event.
        next: u64,
    },
    /// The counter is at its maximum and cannot advance.
    #[error("clock of '{owner}' cannot advance past u64::MAX")]
    CounterOverflow {
        /// Owner of the clock.
        owner: ProcessId,
    },
    /// An event stamped by another process reached this process's log.
    #[error("event owned by '{found}' appended to log of '{owner}'")]
    ForeignEvent {
        /// Owner of the log.
        owner: ProcessId,
        /// Owner recorded in the event's clock.
        found: ProcessId,
    },
}

/// Errors building a [`Ranking`](crate::id::Ranking).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RankingError {
    /// An identity appears more than once.
    #[error("identity '{id}' ranked more than once")]
    DuplicateRank {
        /// The repeated identity.
        id: ProcessId,
    },
    /// An identity has an empty name.
    #[error("ranked identity is empty")]
    EmptyIdentity,
}

/// Outcome of a failed action on a process state machine.
///
/// Carries both severities so the state machine stays a plain value;
/// the owning thread decides that [`ActionError::Invariant`] is fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Recoverable, reported to the caller.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Fatal, the process must abort.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
