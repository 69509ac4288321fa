//! Benchmark profiles for the Lamport clock simulator.
//!
//! - [`synthetic_logs`]: causally consistent logs from a seeded,
//!   single-threaded simulation, sized for ordering benchmarks.
//! - [`ranking_for`]: a ranking that lists every simulated process.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::VecDeque;

use lamport_core::{ActionError, Event, Message, Payload, ProcessId, Ranking, RankingError};
use lamport_engine::ProcessState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Names `p0`, `p1`, ... for `n` processes.
pub fn process_ids(n: usize) -> Vec<ProcessId> {
    (0..n).map(|i| ProcessId::new(format!("p{i}"))).collect()
}

/// Ranking that lists `p0` highest through `p{n-1}` lowest.
pub fn ranking_for(n: usize) -> Result<Ranking, RankingError> {
    Ranking::from_highest(process_ids(n))
}

/// Simulate `processes` processes for `events` total actions and return
/// every log, in process order.
///
/// Each action picks a random process, which first applies one pending
/// message (if any) and then either records an internal step or sends
/// to a random peer. Messages still pending at the end are applied so
/// every send has a matching receipt. Any clock or log error aborts the
/// simulation, so the returned logs are always well formed.
pub fn synthetic_logs(
    processes: usize,
    events: usize,
    seed: u64,
) -> Result<Vec<Vec<Event>>, ActionError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ids = process_ids(processes.max(1));
    let mut states: Vec<ProcessState> = ids.iter().cloned().map(ProcessState::new).collect();
    let mut pending: Vec<VecDeque<Message>> = vec![VecDeque::new(); states.len()];

    for _ in 0..events {
        let i = rng.random_range(0..states.len());
        if let Some(m) = pending[i].pop_front() {
            states[i].on_receive(&m)?;
        }
        if states.len() > 1 && rng.random_bool(0.4) {
            let j = (i + rng.random_range(1..states.len())) % states.len();
            let (_, m) = states[i].stamp_send(ids[j].clone(), Payload::empty())?;
            pending[j].push_back(m);
        } else {
            states[i].record_internal("step")?;
        }
    }

    for (state, queue) in states.iter_mut().zip(pending.iter_mut()) {
        while let Some(m) = queue.pop_front() {
            state.on_receive(&m)?;
        }
    }
    Ok(states.into_iter().map(|s| s.log().to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamport_engine::check_log;

    #[test]
    fn synthetic_logs_are_well_formed() {
        let logs = synthetic_logs(8, 500, 1).unwrap();
        assert_eq!(logs.len(), 8);
        let total: usize = logs.iter().map(Vec::len).sum();
        assert!(total >= 500);
        for (id, log) in process_ids(8).iter().zip(&logs) {
            check_log(id, log).unwrap();
        }
    }

    #[test]
    fn synthetic_logs_are_seeded() {
        assert_eq!(
            synthetic_logs(4, 100, 9).unwrap(),
            synthetic_logs(4, 100, 9).unwrap()
        );
    }
}
