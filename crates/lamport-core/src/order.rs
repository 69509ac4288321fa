//! Total order over the union of all process logs.
//!
//! Events are compared by `(counter, owner rank)`:
//!
//! 1. Lower counter first.
//! 2. On equal counters, the owner with higher precedence in the
//!    [`Ranking`] first.
//!
//! A process never logs two events with the same counter, so the second
//! key always separates distinct events and the comparator is a strict
//! total order. Events that are concurrent in the happens-before sense
//! land in an arbitrary but repeatable relative position; a scalar clock
//! cannot tell them apart from causally related ones.

use std::cmp::Ordering;

use crate::event::Event;
use crate::id::Ranking;

/// Presentation direction of a total order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Oldest logical time first.
    #[default]
    Ascending,
    /// Most recent logical time first.
    Descending,
}

/// Comparator over events under a fixed ranking and direction.
#[derive(Clone, Debug, Default)]
pub struct EventOrder {
    ranking: Ranking,
    direction: Direction,
}

impl EventOrder {
    /// Ascending order under `ranking`.
    pub fn new(ranking: Ranking) -> Self {
        Self {
            ranking,
            direction: Direction::Ascending,
        }
    }

    /// Same ranking, different direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// The ranking used for tie-breaks.
    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    /// The presentation direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compare two events.
    ///
    /// `Equal` only for events with the same counter and owner, which a
    /// well-formed set of logs never contains.
    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let ord = a
            .counter()
            .cmp(&b.counter())
            .then_with(|| self.ranking.compare(a.owner(), b.owner()));
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }

    /// Linearize any number of logs into one sequence.
    ///
    /// The sort is stable, so even malformed input (duplicate stamps)
    /// yields the same output for the same input.
    pub fn sort<L, I>(&self, logs: L) -> Vec<Event>
    where
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = Event>,
    {
        let mut all: Vec<Event> = logs.into_iter().flatten().collect();
        all.sort_by(|a, b| self.compare(a, b));
        all
    }
}

/// Linearize `logs` in ascending order under `ranking`.
pub fn total_order<L, I>(ranking: &Ranking, logs: L) -> Vec<Event>
where
    L: IntoIterator<Item = I>,
    I: IntoIterator<Item = Event>,
{
    EventOrder::new(ranking.clone()).sort(logs)
}

/// Whether `a` could have happened before `b`.
///
/// The contrapositive of the Clock Condition: if `C(a) >= C(b)` then
/// `a` did not happen before `b`. A `true` result does not prove
/// causality.
pub fn may_precede(a: &Event, b: &Event) -> bool {
    a.counter() < b.counter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LamportClock;
    use crate::event::EventLabel;
    use crate::id::ProcessId;
    use proptest::prelude::*;

    fn ev(owner: &str, counter: u64) -> Event {
        Event::new(
            EventLabel::Internal(format!("{owner}{counter}")),
            LamportClock::at(ProcessId::new(owner), counter),
        )
    }

    fn stamps(events: &[Event]) -> Vec<(String, u64)> {
        events
            .iter()
            .map(|e| (e.owner().to_string(), e.counter()))
            .collect()
    }

    #[test]
    fn counter_is_primary_key() {
        let order = EventOrder::new(Ranking::from_highest(["C", "B", "A"]).unwrap());
        assert_eq!(order.compare(&ev("A", 1), &ev("C", 2)), Ordering::Less);
    }

    #[test]
    fn ranking_breaks_ties() {
        let ranking = Ranking::from_highest(["A", "B", "C"]).unwrap();
        let logs = vec![vec![ev("C", 1)], vec![ev("B", 1)], vec![ev("A", 1)]];
        let sorted = total_order(&ranking, logs);
        assert_eq!(
            stamps(&sorted),
            vec![("A".into(), 1), ("B".into(), 1), ("C".into(), 1)]
        );
    }

    #[test]
    fn concurrent_events_sort_the_same_every_time() {
        let ranking = Ranking::lexicographic();
        let logs = vec![vec![ev("Y", 1)], vec![ev("X", 1)]];
        let first = total_order(&ranking, logs.clone());
        let swapped = total_order(&ranking, logs.into_iter().rev().collect::<Vec<_>>());
        assert_eq!(first, swapped);
        assert_eq!(first[0].owner().as_str(), "X");
    }

    #[test]
    fn descending_reverses_ascending() {
        let ranking = Ranking::from_highest(["A", "B"]).unwrap();
        let logs = vec![vec![ev("A", 1), ev("A", 3)], vec![ev("B", 1), ev("B", 2)]];
        let asc = EventOrder::new(ranking.clone()).sort(logs.clone());
        let mut desc = EventOrder::new(ranking)
            .with_direction(Direction::Descending)
            .sort(logs);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn may_precede_follows_counters() {
        assert!(may_precede(&ev("A", 1), &ev("B", 2)));
        assert!(!may_precede(&ev("A", 2), &ev("B", 2)));
    }

    fn arb_event() -> impl Strategy<Value = (u8, u64)> {
        (0u8..5, 0u64..20)
    }

    proptest! {
        #[test]
        fn comparator_is_strict_total_order(x in arb_event(), y in arb_event(), z in arb_event()) {
            let ranking = Ranking::from_highest(["p2", "p0"]).unwrap();
            let order = EventOrder::new(ranking);
            let mk = |(o, c): (u8, u64)| ev(&format!("p{o}"), c);
            let (a, b, c) = (mk(x), mk(y), mk(z));

            // Irreflexive and antisymmetric: equal only for the same stamp.
            prop_assert_eq!(order.compare(&a, &a), Ordering::Equal);
            let same_stamp = a.counter() == b.counter() && a.owner() == b.owner();
            prop_assert_eq!(order.compare(&a, &b) == Ordering::Equal, same_stamp);
            prop_assert_eq!(order.compare(&a, &b), order.compare(&b, &a).reverse());

            // Transitive.
            if order.compare(&a, &b) == Ordering::Less && order.compare(&b, &c) == Ordering::Less {
                prop_assert_eq!(order.compare(&a, &c), Ordering::Less);
            }
        }

        #[test]
        fn sort_is_idempotent(raw in proptest::collection::vec(arb_event(), 0..40)) {
            let ranking = Ranking::lexicographic();
            let events: Vec<Event> = raw.into_iter().map(|(o, c)| ev(&format!("p{o}"), c)).collect();
            let once = total_order(&ranking, vec![events]);
            let twice = total_order(&ranking, vec![once.clone()]);
            prop_assert_eq!(once, twice);
        }
    }
}
