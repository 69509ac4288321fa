//! Digest of an ordered event sequence.
//!
//! Uses FNV-1a for fast, deterministic hashing. Not cryptographically
//! secure; used to check that repeated orderings of the same logs are
//! identical without comparing them element by element.

use crate::event::{Event, EventLabel};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Length-prefixed so that `"ab" + "c"` and `"a" + "bc"` differ.
#[inline]
fn fnv1a_str(mut hash: u64, s: &str) -> u64 {
    hash = fnv1a_u64(hash, s.len() as u64);
    for &b in s.as_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash every event's counter, owner and label, in sequence order.
///
/// Returns `FNV_OFFSET` for an empty sequence.
pub fn order_digest<'a, I>(events: I) -> u64
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut hash = FNV_OFFSET;
    for event in events {
        hash = fnv1a_u64(hash, event.counter());
        hash = fnv1a_str(hash, event.owner().as_str());
        hash = match event.label() {
            EventLabel::Internal(name) => fnv1a_str(fnv1a_byte(hash, 0), name),
            EventLabel::Sent { to } => fnv1a_str(fnv1a_byte(hash, 1), to.as_str()),
            EventLabel::Received { from } => fnv1a_str(fnv1a_byte(hash, 2), from.as_str()),
        };
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LamportClock;
    use crate::id::ProcessId;

    fn ev(owner: &str, counter: u64, label: EventLabel) -> Event {
        Event::new(label, LamportClock::at(ProcessId::new(owner), counter))
    }

    #[test]
    fn empty_sequence_is_offset() {
        assert_eq!(order_digest(std::iter::empty::<&Event>()), FNV_OFFSET);
    }

    #[test]
    fn order_matters() {
        let a = ev("A", 1, EventLabel::Internal("x".into()));
        let b = ev("B", 1, EventLabel::Internal("x".into()));
        assert_ne!(order_digest([&a, &b]), order_digest([&b, &a]));
    }

    #[test]
    fn label_kind_matters() {
        let to_b = ev("A", 2, EventLabel::Sent { to: "B".into() });
        let from_b = ev("A", 2, EventLabel::Received { from: "B".into() });
        assert_ne!(order_digest([&to_b]), order_digest([&from_b]));
    }
}
