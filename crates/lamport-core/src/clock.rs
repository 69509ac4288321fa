//! Scalar Lamport clock.
//!
//! The Clock Condition: if `a` happens before `b` (`a -> b`), then
//! `C(a) < C(b)`. Two rules uphold it:
//!
//! - **Local or send event**: `C := C + 1`, then stamp the event.
//! - **Receive of message `m`**: `C := max(C, C(m)) + 1`, then stamp.
//!
//! The receive rule must merge before incrementing. Incrementing alone
//! on receipt lets a receive event carry a smaller timestamp than the
//! send that caused it, which breaks the condition.
//!
//! Updates never mutate in place: every operation returns a new clock
//! and the owning process swaps it in. A counter at `u64::MAX` cannot
//! advance; both updates report that as [`InvariantViolation`] rather
//! than wrapping.

use std::fmt;

use crate::error::InvariantViolation;
use crate::id::ProcessId;

/// A counter paired with the identity of the process that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LamportClock {
    counter: u64,
    owner: ProcessId,
}

impl LamportClock {
    /// A fresh clock at counter 0.
    pub fn new(owner: ProcessId) -> Self {
        Self { counter: 0, owner }
    }

    /// A clock at an arbitrary counter. Used to rebuild stamps.
    pub fn at(owner: ProcessId, counter: u64) -> Self {
        Self { counter, owner }
    }

    /// The next clock for a local or send event.
    pub fn increment(&self) -> Result<Self, InvariantViolation> {
        self.advance_from(self.counter)
    }

    /// The next clock for receipt of a message stamped `received`.
    pub fn merge_on_receive(&self, received: u64) -> Result<Self, InvariantViolation> {
        self.advance_from(self.counter.max(received))
    }

    fn advance_from(&self, base: u64) -> Result<Self, InvariantViolation> {
        let counter = base
            .checked_add(1)
            .ok_or_else(|| InvariantViolation::CounterOverflow {
                owner: self.owner.clone(),
            })?;
        Ok(Self {
            counter,
            owner: self.owner.clone(),
        })
    }

    /// Current counter value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.counter
    }

    /// The owning process.
    #[inline]
    pub fn owner(&self) -> &ProcessId {
        &self.owner
    }
}

impl fmt::Display for LamportClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.owner, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clock(counter: u64) -> LamportClock {
        LamportClock::at(ProcessId::new("P"), counter)
    }

    #[test]
    fn starts_at_zero() {
        let c = LamportClock::new(ProcessId::new("A"));
        assert_eq!(c.value(), 0);
        assert_eq!(c.owner().as_str(), "A");
    }

    #[test]
    fn increment_returns_new_value() {
        let c = clock(4);
        let next = c.increment().unwrap();
        assert_eq!(c.value(), 4);
        assert_eq!(next.value(), 5);
        assert_eq!(next.owner(), c.owner());
    }

    #[test]
    fn merge_takes_sender_when_ahead() {
        assert_eq!(clock(0).merge_on_receive(2).unwrap().value(), 3);
    }

    #[test]
    fn merge_keeps_local_when_ahead() {
        assert_eq!(clock(9).merge_on_receive(2).unwrap().value(), 10);
    }

    #[test]
    fn plain_increment_on_receive_breaks_clock_condition() {
        // Sender is far ahead; incrementing alone stamps the receive
        // before the send that caused it.
        let send_stamp = 7;
        let wrong = clock(0).increment().unwrap();
        assert!(wrong.value() <= send_stamp);
        let right = clock(0).merge_on_receive(send_stamp).unwrap();
        assert!(right.value() > send_stamp);
    }

    #[test]
    fn saturated_counter_reports_overflow() {
        let overflow = InvariantViolation::CounterOverflow {
            owner: ProcessId::new("P"),
        };
        assert_eq!(clock(u64::MAX).increment(), Err(overflow.clone()));
        assert_eq!(clock(3).merge_on_receive(u64::MAX), Err(overflow));
        assert_eq!(
            clock(u64::MAX - 1).increment().map(|c| c.value()),
            Ok(u64::MAX)
        );
    }

    #[test]
    fn display_shows_owner_and_counter() {
        assert_eq!(clock(3).to_string(), "P@3");
    }

    proptest! {
        #[test]
        fn merge_is_max_plus_one(local in 0u64..1_000_000, received in 0u64..1_000_000) {
            let merged = clock(local).merge_on_receive(received).unwrap();
            prop_assert_eq!(merged.value(), local.max(received) + 1);
            prop_assert!(merged.value() >= local + 1);
            prop_assert!(merged.value() >= received + 1);
        }

        #[test]
        fn updates_never_decrease(
            start in 0u64..1_000,
            steps in proptest::collection::vec(proptest::option::of(0u64..2_000), 1..50),
        ) {
            let mut c = clock(start);
            for step in steps {
                let next = match step {
                    Some(received) => c.merge_on_receive(received).unwrap(),
                    None => c.increment().unwrap(),
                };
                prop_assert!(next.value() > c.value());
                c = next;
            }
        }
    }
}
