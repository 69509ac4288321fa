//! Thread-per-process engine for Lamport clock simulations.
//!
//! Provides the [`System`] driver that starts processes, connects their
//! mailboxes, detects quiescence and collects logs for total ordering.
//! Each process runs its task on a dedicated thread that owns the
//! process's clock and log exclusively.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor;
pub mod config;
mod directory;
pub mod handle;
pub mod process;
pub mod system;

pub use actor::{task, Delivery, ProcessContext, Task};
pub use config::{AfterTask, ConfigError, SystemConfig};
pub use directory::SystemStats;
pub use handle::ProcessHandle;
pub use process::{check_log, ProcessState, ProcessStatus};
pub use system::{ShutdownReport, System};
