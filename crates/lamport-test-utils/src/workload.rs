//! Seeded random workloads.
//!
//! A workload is a script of [`Step`]s per process. Scripts are plain
//! data so the same seed always produces the same script, whatever the
//! thread interleaving does with it at run time.

use indexmap::IndexMap;
use lamport_core::ProcessId;
use rand::distr::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One scripted action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Record a local step with this label.
    Internal(String),
    /// Send a payload to a peer.
    Send { to: ProcessId, payload: String },
    /// Apply whatever has arrived, without blocking.
    Poll,
}

/// Shape of a generated workload.
#[derive(Clone, Debug)]
pub struct WorkloadShape {
    pub processes: usize,
    pub steps_per_process: usize,
    /// Chance (0..=100) that a step is a send.
    pub send_percent: u32,
    /// Chance (0..=100) that a non-send step is a poll.
    pub poll_percent: u32,
    pub payload_len: usize,
}

impl Default for WorkloadShape {
    fn default() -> Self {
        Self {
            processes: 4,
            steps_per_process: 32,
            send_percent: 40,
            poll_percent: 30,
            payload_len: 8,
        }
    }
}

/// Names `P0`, `P1`, ... for `n` processes.
pub fn process_names(n: usize) -> Vec<ProcessId> {
    (0..n).map(|i| ProcessId::new(format!("P{i}"))).collect()
}

/// A random alphanumeric payload.
pub fn random_payload(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate one script per process from `seed`.
///
/// Sends only target other processes in the workload. With a single
/// process every step is local.
pub fn generate(shape: &WorkloadShape, seed: u64) -> IndexMap<ProcessId, Vec<Step>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let names = process_names(shape.processes);
    let mut scripts = IndexMap::with_capacity(names.len());

    for (i, name) in names.iter().enumerate() {
        let mut script = Vec::with_capacity(shape.steps_per_process);
        for n in 0..shape.steps_per_process {
            let roll = rng.random_range(0..100);
            let step = if names.len() > 1 && roll < shape.send_percent {
                let mut j = rng.random_range(0..names.len() - 1);
                if j >= i {
                    j += 1;
                }
                Step::Send {
                    to: names[j].clone(),
                    payload: random_payload(&mut rng, shape.payload_len),
                }
            } else if rng.random_range(0..100) < shape.poll_percent {
                Step::Poll
            } else {
                Step::Internal(format!("{name}-{n}"))
            };
            script.push(step);
        }
        scripts.insert(name.clone(), script);
    }
    scripts
}

/// Number of sends in a script.
pub fn send_count(script: &[Step]) -> usize {
    script
        .iter()
        .filter(|s| matches!(s, Step::Send { .. }))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_scripts() {
        let shape = WorkloadShape::default();
        assert_eq!(generate(&shape, 7), generate(&shape, 7));
        assert_ne!(generate(&shape, 7), generate(&shape, 8));
    }

    #[test]
    fn sends_never_target_self() {
        let shape = WorkloadShape {
            send_percent: 100,
            ..WorkloadShape::default()
        };
        for (name, script) in generate(&shape, 3) {
            assert_eq!(send_count(&script), shape.steps_per_process);
            for step in script {
                if let Step::Send { to, payload } = step {
                    assert_ne!(to, name);
                    assert_eq!(payload.len(), shape.payload_len);
                }
            }
        }
    }

    #[test]
    fn single_process_is_all_local() {
        let shape = WorkloadShape {
            processes: 1,
            send_percent: 100,
            ..WorkloadShape::default()
        };
        let scripts = generate(&shape, 1);
        assert_eq!(send_count(&scripts[0]), 0);
    }
}
