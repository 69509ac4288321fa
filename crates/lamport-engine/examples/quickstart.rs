//! Lamport quickstart: three processes gossiping random payloads.
//!
//! Demonstrates:
//!   1. Building a `SystemConfig` with an explicit ranking
//!   2. Launching processes whose tasks record, send and receive
//!   3. Driving a process from outside through its `ProcessHandle`
//!   4. Shutting down and printing the merged total order
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use std::time::Duration;

use lamport_core::{order_digest, ProcessError, Ranking};
use lamport_engine::{task, ProcessContext, System, SystemConfig};
use rand::distr::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

// ─── Workload parameters ────────────────────────────────────────

const PEERS: [&str; 3] = ["alice", "bob", "carol"];
const ROUNDS: usize = 4;
const PAYLOAD_LEN: usize = 6;
const SEED: u64 = 2024;

fn payload(rng: &mut ChaCha8Rng) -> String {
    rng.sample_iter(Alphanumeric)
        .take(PAYLOAD_LEN)
        .map(char::from)
        .collect()
}

// ─── Task: gossip to the next peer, then listen ─────────────────

fn gossip(me: usize, seed: u64) -> impl FnOnce(&mut ProcessContext<'_>) -> Result<(), ProcessError> {
    move |ctx: &mut ProcessContext<'_>| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let next = PEERS[(me + 1) % PEERS.len()];
        for round in 0..ROUNDS {
            ctx.record_internal(format!("round {round}"))?;
            ctx.send(next, payload(&mut rng))?;
            if let Some(got) = ctx.receive_timeout(Duration::from_millis(50))? {
                println!(
                    "  {} got {:?} from {} at {}",
                    ctx.id(),
                    got.payload(),
                    got.from(),
                    got.event().counter()
                );
            }
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ranking = match Ranking::from_highest(PEERS) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("bad ranking: {e}");
            return;
        }
    };
    let mut system = match System::new(SystemConfig::with_ranking(ranking)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("bad config: {e}");
            return;
        }
    };

    println!("Starting {} processes...", PEERS.len());
    let handles = system
        .launch(
            PEERS
                .iter()
                .enumerate()
                .map(|(i, name)| (*name, task(gossip(i, SEED + i as u64)))),
        )
        .unwrap_or_else(|e| panic!("launch failed: {e}"));

    if !system.quiesce(Duration::from_secs(5)) {
        eprintln!("system did not settle: {:?}", system.stats());
    }

    // Poke alice from outside once the tasks are done.
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    match handles[0].send("carol", payload(&mut rng)) {
        Ok(event) => println!("\ndriver: {event}"),
        Err(e) => println!("\ndriver: send failed: {e}"),
    }

    let report = system.shutdown();
    println!(
        "\nShut down in {}ms ({} joined, {} panicked)",
        report.total_ms,
        report.joined,
        report.panicked.len()
    );

    println!("\nTotal order:");
    let order = system.total_order();
    for event in &order {
        println!("  {event}");
    }
    println!("\ndigest: {:016x}", order_digest(&order));
}
