//! Core types for the Lamport simulation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the value types shared by every other crate in the workspace:
//! process identities and rankings, the scalar logical clock, events,
//! messages, error types, and the total-order function over event logs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod event;
pub mod hash;
pub mod id;
pub mod message;
pub mod order;

pub use clock::LamportClock;
pub use error::{ActionError, InvariantViolation, ProcessError, RankingError};
pub use event::{Event, EventLabel};
pub use hash::order_digest;
pub use id::{ProcessId, Ranking};
pub use message::{Message, Payload};
pub use order::{may_precede, total_order, Direction, EventOrder};
