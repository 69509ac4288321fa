//! End-to-end ordering scenarios on the threaded engine.
//!
//! The relay runs A -> B -> C with each hop causally after the last, so
//! the resulting counters are fully determined. The concurrent case has
//! no messages at all and relies on the rank tie-break alone.

use std::time::Duration;

use lamport_core::{order_digest, Ranking};
use lamport_engine::{task, System, SystemConfig};
use lamport_test_utils::checks::check_run;
use lamport_test_utils::render;
use lamport_test_utils::scenario::{relay_ranking, DONE, RELAY_EXPECTED, START, WORK};

const SETTLE: Duration = Duration::from_secs(5);

fn run_relay() -> System {
    let mut sys = System::new(SystemConfig::with_ranking(relay_ranking().unwrap())).unwrap();
    sys.launch(vec![
        (
            "A",
            task(|ctx| {
                ctx.record_internal(START)?;
                ctx.send("B", "hello")?;
                Ok(())
            }),
        ),
        (
            "B",
            task(|ctx| {
                let got = ctx.receive()?;
                assert_eq!(got.from().as_str(), "A");
                assert_eq!(got.payload().as_str(), Some("hello"));
                ctx.record_internal(WORK)?;
                ctx.send("C", "relay")?;
                Ok(())
            }),
        ),
        (
            "C",
            task(|ctx| {
                ctx.receive()?;
                ctx.record_internal(DONE)?;
                Ok(())
            }),
        ),
    ])
    .unwrap();
    assert!(sys.quiesce(SETTLE), "relay did not settle");
    sys
}

#[test]
fn relay_produces_expected_total_order() {
    let mut sys = run_relay();
    let report = sys.shutdown();
    assert!(report.quiesced);
    assert_eq!(report.joined, 3);
    assert!(report.panicked.is_empty());
    assert!(report.task_errors.is_empty());
    check_run(&report.logs).unwrap();

    assert_eq!(render(&sys.total_order()), RELAY_EXPECTED);
}

#[test]
fn relay_logs_are_per_process() {
    let mut sys = run_relay();
    let logs = sys.logs();
    assert_eq!(render(&logs["A"]), ["A@1 start", "A@2 sent to B"]);
    assert_eq!(
        render(&logs["B"]),
        ["B@3 received from A", "B@4 work", "B@5 sent to C"]
    );
    assert_eq!(render(&logs["C"]), ["C@6 received from B", "C@7 done"]);
    let stats = sys.stats();
    assert_eq!(stats.messages_sent, 2);
    assert_eq!(stats.messages_delivered, 2);
    assert_eq!(stats.events_recorded, 7);
    sys.shutdown();
}

#[test]
fn relay_order_is_repeatable() {
    let first = run_relay().total_order();
    let second = run_relay().total_order();
    assert_eq!(first, second);
    assert_eq!(order_digest(&first), order_digest(&second));
}

fn run_concurrent(ranking: Ranking) -> Vec<String> {
    let mut sys = System::new(SystemConfig::with_ranking(ranking)).unwrap();
    sys.start("X", |ctx| ctx.record_internal("x").map(|_| ()))
        .unwrap();
    sys.start("Y", |ctx| ctx.record_internal("y").map(|_| ()))
        .unwrap();
    assert!(sys.quiesce(SETTLE));
    sys.shutdown();
    render(&sys.total_order())
}

#[test]
fn concurrent_events_break_ties_by_rank() {
    let ranked = Ranking::from_highest(["Y", "X"]).unwrap();
    for _ in 0..5 {
        assert_eq!(run_concurrent(ranked.clone()), ["Y@1 y", "X@1 x"]);
    }
}

#[test]
fn concurrent_events_default_to_lexicographic() {
    for _ in 0..5 {
        assert_eq!(run_concurrent(Ranking::lexicographic()), ["X@1 x", "Y@1 y"]);
    }
}

#[test]
fn self_send_is_applied_in_place() {
    let mut sys = System::new(SystemConfig::default()).unwrap();
    sys.start("A", |ctx| {
        ctx.send("A", "note")?;
        let got = ctx.try_receive()?.expect("self-send delivered");
        assert_eq!(got.event().counter(), 2);
        Ok(())
    })
    .unwrap();
    let report = sys.shutdown();
    assert!(report.panicked.is_empty());
    assert_eq!(
        render(&report.logs["A"]),
        ["A@1 sent to A", "A@2 received from A"]
    );
}

#[test]
fn arrived_message_is_applied_before_next_step() {
    let (arrived_tx, arrived_rx) = crossbeam_channel::bounded::<()>(1);
    let mut sys = System::new(SystemConfig::default()).unwrap();
    sys.launch(vec![
        (
            "A",
            task(move |ctx| {
                ctx.send("B", "m")?;
                // Hand-off is done once send returns.
                let _ = arrived_tx.send(());
                Ok(())
            }),
        ),
        (
            "B",
            task(move |ctx| {
                let _ = arrived_rx.recv();
                ctx.record_internal("w")?;
                Ok(())
            }),
        ),
    ])
    .unwrap();
    assert!(sys.quiesce(SETTLE));
    let logs = sys.logs();
    assert_eq!(render(&logs["B"]), ["B@2 received from A", "B@3 w"]);
    sys.shutdown();
}

#[test]
fn unread_deliveries_can_be_discarded() {
    let mut sys = System::new(SystemConfig::default()).unwrap();
    sys.start("A", |ctx| {
        for _ in 0..3 {
            ctx.send("A", "note")?;
        }
        assert_eq!(ctx.unread(), 3);
        assert_eq!(ctx.discard_unread(), 3);
        assert_eq!(ctx.unread(), 0);
        assert!(ctx.try_receive()?.is_none());
        Ok(())
    })
    .unwrap();
    let report = sys.shutdown();
    assert!(report.panicked.is_empty());
    assert!(report.task_errors.is_empty());
    assert_eq!(report.logs["A"].len(), 6);
}
