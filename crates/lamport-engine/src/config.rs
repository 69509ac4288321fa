//! System configuration, validation, and error types.
//!
//! [`SystemConfig`] is the input for constructing a [`System`](crate::System).
//! [`validate()`](SystemConfig::validate) checks structural invariants
//! before any thread is spawned.

use lamport_core::{Direction, ProcessId, Ranking};
use thiserror::Error;

// ── AfterTask ──────────────────────────────────────────────────────

/// What a process does once its task returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AfterTask {
    /// Keep applying inbound messages and handle requests until the
    /// system stops the process.
    #[default]
    Linger,
    /// Terminate immediately. Later sends to it fail with
    /// `UnknownRecipient`.
    Terminate,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SystemConfig::validate()`] and process start-up.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A bounded mailbox must hold at least one message.
    #[error("mailbox_capacity must be at least 1")]
    MailboxCapacityZero,
    /// A process with this identity is already registered.
    #[error("process '{id}' is already registered")]
    DuplicateProcess {
        /// The repeated identity.
        id: ProcessId,
    },
    /// Process identities must be non-empty.
    #[error("process identity is empty")]
    EmptyIdentity,
    /// Thread name prefix must be non-empty.
    #[error("thread_prefix must not be empty")]
    EmptyThreadPrefix,
    /// The OS refused to spawn a process thread.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

// ── SystemConfig ───────────────────────────────────────────────────

/// Complete configuration for a simulated system of processes.
#[derive(Clone, Debug)]
pub struct SystemConfig {
    /// Tie-break order for events with equal counters.
    pub ranking: Ranking,
    /// Presentation direction of [`System::total_order`](crate::System::total_order).
    pub direction: Direction,
    /// Per-process mailbox capacity. `None` = unbounded (default).
    ///
    /// With a bounded mailbox a sender waits while the receiver's
    /// mailbox is full, applying its own inbound messages meanwhile.
    /// The directory is not locked while it waits, so other senders
    /// and new processes are unaffected.
    pub mailbox_capacity: Option<usize>,
    /// Behaviour once a process's task returns. Default: linger.
    pub after_task: AfterTask,
    /// Time budget for [`System::shutdown`](crate::System::shutdown) to
    /// wait for quiescence before stopping processes. Default: 2000.
    pub shutdown_budget_ms: u64,
    /// Prefix for process thread names (`<prefix>-<id>`). Default: `"lamport"`.
    pub thread_prefix: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ranking: Ranking::lexicographic(),
            direction: Direction::Ascending,
            mailbox_capacity: None,
            after_task: AfterTask::Linger,
            shutdown_budget_ms: 2000,
            thread_prefix: "lamport".into(),
        }
    }
}

impl SystemConfig {
    /// Default configuration with an explicit ranking.
    pub fn with_ranking(ranking: Ranking) -> Self {
        Self {
            ranking,
            ..Self::default()
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == Some(0) {
            return Err(ConfigError::MailboxCapacityZero);
        }
        if self.thread_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadPrefix);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SystemConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = SystemConfig {
            mailbox_capacity: Some(0),
            ..SystemConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MailboxCapacityZero));
    }

    #[test]
    fn bounded_capacity_accepted() {
        let config = SystemConfig {
            mailbox_capacity: Some(4),
            ..SystemConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_prefix_rejected() {
        let config = SystemConfig {
            thread_prefix: String::new(),
            ..SystemConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyThreadPrefix));
    }
}
