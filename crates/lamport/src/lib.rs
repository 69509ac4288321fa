//! Lamport: a logical-clock simulator for concurrent message-passing
//! processes.
//!
//! Every process owns a scalar clock and an append-only event log.
//! Internal steps and sends advance the clock by one; a receive merges
//! the sender's counter as `max(local, received) + 1`. After a run the
//! logs of all processes are merged into a single total order: by
//! counter, ties broken by a fixed process ranking.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Lamport sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use lamport::prelude::*;
//!
//! let ranking = Ranking::from_highest(["A", "B"]).unwrap();
//! let mut system = System::new(SystemConfig::with_ranking(ranking)).unwrap();
//! system
//!     .launch(vec![
//!         ("A", task(|ctx| {
//!             ctx.record_internal("start")?;
//!             ctx.send("B", "hello")?;
//!             Ok(())
//!         })),
//!         ("B", task(|ctx| {
//!             ctx.receive()?;
//!             Ok(())
//!         })),
//!     ])
//!     .unwrap();
//!
//! assert!(system.quiesce(Duration::from_secs(5)));
//! system.shutdown();
//!
//! let order: Vec<String> = system.total_order().iter().map(|e| e.to_string()).collect();
//! assert_eq!(order, ["A@1 start", "A@2 sent to B", "B@3 received from A"]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `lamport-core` | Clocks, events, messages, rankings, ordering |
//! | [`engine`] | `lamport-engine` | Process threads, handles and the `System` driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Clocks, events, identities and ordering (`lamport-core`).
///
/// Everything here is plain data with no threads: [`types::LamportClock`],
/// [`types::Event`], [`types::Ranking`] and the [`types::total_order`]
/// function.
pub use lamport_core as types;

/// Threaded simulation engine (`lamport-engine`).
///
/// [`engine::System`] starts one thread per process;
/// [`engine::ProcessContext`] is what a task sees of its process.
pub use lamport_engine as engine;

/// Common imports for typical Lamport usage.
///
/// ```rust
/// use lamport::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use lamport_core::{
        Direction, Event, EventLabel, EventOrder, LamportClock, Message, Payload, ProcessId,
        Ranking,
    };

    // Ordering
    pub use lamport_core::{may_precede, order_digest, total_order};

    // Errors
    pub use lamport_core::{InvariantViolation, ProcessError, RankingError};

    // Engine
    pub use lamport_engine::{
        task, AfterTask, ConfigError, Delivery, ProcessContext, ProcessHandle, ShutdownReport,
        System, SystemConfig, Task,
    };
}
