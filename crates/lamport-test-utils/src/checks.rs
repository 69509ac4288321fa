//! Whole-run invariant checkers.
//!
//! Each checker returns a human-readable description of the first
//! violation it finds, so tests can `assert!(check(..).is_ok(), ..)` or
//! unwrap for a useful panic message.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use lamport_core::{Event, EventLabel, ProcessId};

/// Every event belongs to its log's owner and counters strictly increase.
pub fn check_monotonic(logs: &IndexMap<ProcessId, Vec<Event>>) -> Result<(), String> {
    for (owner, log) in logs {
        let mut last = 0u64;
        for (i, event) in log.iter().enumerate() {
            if event.owner() != owner {
                return Err(format!("{owner}[{i}]: event {event} owned by {}", event.owner()));
            }
            if event.counter() <= last {
                return Err(format!(
                    "{owner}[{i}]: counter {} not above previous {last}",
                    event.counter()
                ));
            }
            last = event.counter();
        }
    }
    Ok(())
}

/// Every receipt matches an earlier send and is stamped after it.
///
/// Messages between one pair of processes are applied in the order they
/// were sent, so the k-th `received from X` at P pairs with the k-th
/// `sent to P` in X's log. Sends without a matching receipt are allowed
/// (the run may have stopped before delivery).
pub fn check_causal(logs: &IndexMap<ProcessId, Vec<Event>>) -> Result<(), String> {
    let mut sends: HashMap<(&ProcessId, &ProcessId), VecDeque<u64>> = HashMap::new();
    for (owner, log) in logs {
        for event in log {
            if let EventLabel::Sent { to } = event.label() {
                sends.entry((owner, to)).or_default().push_back(event.counter());
            }
        }
    }

    for (owner, log) in logs {
        for event in log {
            let EventLabel::Received { from } = event.label() else {
                continue;
            };
            let Some(sent_at) = sends.get_mut(&(from, owner)).and_then(VecDeque::pop_front) else {
                return Err(format!("{event} has no matching send from {from}"));
            };
            if event.counter() <= sent_at {
                return Err(format!("{event} not after its send at {from}@{sent_at}"));
            }
        }
    }
    Ok(())
}

/// Both [`check_monotonic`] and [`check_causal`].
pub fn check_run(logs: &IndexMap<ProcessId, Vec<Event>>) -> Result<(), String> {
    check_monotonic(logs)?;
    check_causal(logs)
}

/// Every receipt in `logs` has been matched by exactly one send and vice
/// versa. Only holds once the run is quiet.
pub fn check_all_delivered(logs: &IndexMap<ProcessId, Vec<Event>>) -> Result<(), String> {
    let mut balance: HashMap<(&ProcessId, &ProcessId), i64> = HashMap::new();
    for (owner, log) in logs {
        for event in log {
            match event.label() {
                EventLabel::Sent { to } => *balance.entry((owner, to)).or_default() += 1,
                EventLabel::Received { from } => *balance.entry((from, owner)).or_default() -= 1,
                EventLabel::Internal(_) => {}
            }
        }
    }
    match balance.into_iter().find(|(_, n)| *n != 0) {
        Some(((from, to), n)) => Err(format!("{from} -> {to}: {n} sends without receipt")),
        None => Ok(()),
    }
}
