//! Test utilities for Lamport development.
//!
//! - [`checks`]: whole-run invariant checkers over collected logs.
//! - [`scenario`]: the three-process relay fixture and its expected order.
//! - [`workload`]: seeded random scripts for stress and property tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod checks;
pub mod scenario;
pub mod workload;

use lamport_core::Event;

/// Render events as `owner@counter label` for readable assertions.
pub fn render(events: &[Event]) -> Vec<String> {
    events.iter().map(ToString::to_string).collect()
}
