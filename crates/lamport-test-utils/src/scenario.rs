//! The three-process relay: A works and tells B, B works and tells C,
//! C finishes.

use lamport_core::{Ranking, RankingError};

/// Process names in rank order, highest first.
pub const RELAY: [&str; 3] = ["A", "B", "C"];

/// Label of A's opening internal step.
pub const START: &str = "start";
/// Label of B's internal step between receipt and relay.
pub const WORK: &str = "work";
/// Label of C's closing internal step.
pub const DONE: &str = "done";

/// The relay's total order, rendered as `owner@counter label`.
pub const RELAY_EXPECTED: [&str; 7] = [
    "A@1 start",
    "A@2 sent to B",
    "B@3 received from A",
    "B@4 work",
    "B@5 sent to C",
    "C@6 received from B",
    "C@7 done",
];

/// A > B > C.
pub fn relay_ranking() -> Result<Ranking, RankingError> {
    Ranking::from_highest(RELAY)
}
