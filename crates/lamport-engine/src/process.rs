//! Per-process clock and log state machine.
//!
//! [`ProcessState`] is a plain value with no threads or channels: the
//! actor that owns it serializes every call. Each action swaps in a new
//! clock, stamps exactly one event with it, and appends that event to
//! the log. The log is append-only and its counters strictly increase.

use lamport_core::{
    ActionError, Event, EventLabel, InvariantViolation, LamportClock, Message, Payload,
    ProcessError, ProcessId,
};

/// Lifecycle of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Accepting actions.
    Running,
    /// Finished or stopped; every action fails with `ProcessTerminated`.
    Terminated,
}

/// Clock, log and lifecycle of one process.
#[derive(Clone, Debug)]
pub struct ProcessState {
    id: ProcessId,
    clock: LamportClock,
    log: Vec<Event>,
    status: ProcessStatus,
}

impl ProcessState {
    /// A running process at counter 0 with an empty log.
    pub fn new(id: ProcessId) -> Self {
        Self {
            clock: LamportClock::new(id.clone()),
            id,
            log: Vec::new(),
            status: ProcessStatus::Running,
        }
    }

    /// The process identity.
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// The current clock.
    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    /// Logged events in insertion order.
    pub fn log(&self) -> &[Event] {
        &self.log
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Whether the process has terminated.
    pub fn is_terminated(&self) -> bool {
        self.status == ProcessStatus::Terminated
    }

    /// Stop accepting actions. The log is kept.
    pub fn terminate(&mut self) {
        self.status = ProcessStatus::Terminated;
    }

    /// Record a local step.
    pub fn record_internal(&mut self, label: impl Into<String>) -> Result<Event, ActionError> {
        self.ensure_running()?;
        let next = self.clock.increment()?;
        Ok(self.commit(next, EventLabel::Internal(label.into()))?)
    }

    /// Stamp a send to `to` and build the message that carries the stamp.
    ///
    /// The clock moves and the `sent to` event is logged before the
    /// message exists, so the counter it carries is exactly the one in
    /// the log. Hand-off is the caller's job.
    pub fn stamp_send(
        &mut self,
        to: ProcessId,
        payload: Payload,
    ) -> Result<(Event, Message), ActionError> {
        self.ensure_running()?;
        let next = self.clock.increment()?;
        let event = self.commit(next, EventLabel::Sent { to: to.clone() })?;
        let message = Message::new(self.id.clone(), to, event.counter(), payload);
        Ok((event, message))
    }

    /// Apply a delivered message: merge, then log the receipt.
    pub fn on_receive(&mut self, message: &Message) -> Result<Event, ActionError> {
        self.ensure_running()?;
        let next = self.clock.merge_on_receive(message.counter())?;
        let event = self.commit(
            next,
            EventLabel::Received {
                from: message.sender().clone(),
            },
        )?;
        debug_assert!(event.counter() > message.counter());
        Ok(event)
    }

    /// Re-check the whole log against this process's invariants.
    pub fn check(&self) -> Result<(), InvariantViolation> {
        check_log(&self.id, &self.log)?;
        if let Some(last) = self.log.last() {
            if self.clock.value() < last.counter() {
                return Err(InvariantViolation::ClockRegressed {
                    owner: self.id.clone(),
                    previous: last.counter(),
                    observed: self.clock.value(),
                });
            }
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), ProcessError> {
        match self.status {
            ProcessStatus::Running => Ok(()),
            ProcessStatus::Terminated => Err(ProcessError::ProcessTerminated {
                id: self.id.clone(),
            }),
        }
    }

    /// Swap in `next`, stamp `label` with it, append.
    fn commit(&mut self, next: LamportClock, label: EventLabel) -> Result<Event, InvariantViolation> {
        if next.value() < self.clock.value() {
            return Err(InvariantViolation::ClockRegressed {
                owner: self.id.clone(),
                previous: self.clock.value(),
                observed: next.value(),
            });
        }
        if next.owner() != &self.id {
            return Err(InvariantViolation::ForeignEvent {
                owner: self.id.clone(),
                found: next.owner().clone(),
            });
        }
        if let Some(last) = self.log.last() {
            if next.value() <= last.counter() {
                return Err(InvariantViolation::NonIncreasingLog {
                    owner: self.id.clone(),
                    last: last.counter(),
                    next: next.value(),
                });
            }
        }
        let event = Event::new(label, next.clone());
        self.clock = next;
        self.log.push(event.clone());
        Ok(event)
    }
}

/// Check that every event in `log` belongs to `owner` and that counters
/// strictly increase in insertion order.
pub fn check_log(owner: &ProcessId, log: &[Event]) -> Result<(), InvariantViolation> {
    let mut last: Option<u64> = None;
    for event in log {
        if event.owner() != owner {
            return Err(InvariantViolation::ForeignEvent {
                owner: owner.clone(),
                found: event.owner().clone(),
            });
        }
        if let Some(prev) = last {
            if event.counter() <= prev {
                return Err(InvariantViolation::NonIncreasingLog {
                    owner: owner.clone(),
                    last: prev,
                    next: event.counter(),
                });
            }
        }
        last = Some(event.counter());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProcessId {
        ProcessId::new(s)
    }

    #[test]
    fn internal_event_increments() {
        let mut p = ProcessState::new(pid("A"));
        let e = p.record_internal("boot").unwrap();
        assert_eq!(e.counter(), 1);
        assert_eq!(p.clock().value(), 1);
        assert_eq!(p.log(), &[e]);
    }

    #[test]
    fn send_logs_before_message_carries_stamp() {
        let mut p = ProcessState::new(pid("A"));
        p.record_internal("x").unwrap();
        let (event, message) = p.stamp_send(pid("B"), Payload::from("hi")).unwrap();
        assert_eq!(event.counter(), 2);
        assert_eq!(message.counter(), 2);
        assert_eq!(message.sender(), &pid("A"));
        assert_eq!(message.receiver(), &pid("B"));
        assert_eq!(event.label().to_string(), "sent to B");
        assert_eq!(p.log().last(), Some(&event));
    }

    #[test]
    fn receive_merges_with_sender_counter() {
        let mut a = ProcessState::new(pid("A"));
        let mut b = ProcessState::new(pid("B"));
        a.record_internal("x").unwrap();
        let (_, m) = a.stamp_send(pid("B"), Payload::empty()).unwrap();

        let before = b.clock().value();
        let e = b.on_receive(&m).unwrap();
        assert_eq!(e.counter(), 3);
        assert!(e.counter() > m.counter());
        assert!(e.counter() > before);
        assert_eq!(e.label().to_string(), "received from A");
    }

    #[test]
    fn receive_when_local_ahead() {
        let mut a = ProcessState::new(pid("A"));
        let mut b = ProcessState::new(pid("B"));
        for _ in 0..5 {
            b.record_internal("work").unwrap();
        }
        let (_, m) = a.stamp_send(pid("B"), Payload::empty()).unwrap();
        assert_eq!(b.on_receive(&m).unwrap().counter(), 6);
    }

    #[test]
    fn terminated_rejects_every_action() {
        let mut p = ProcessState::new(pid("A"));
        p.record_internal("x").unwrap();
        p.terminate();
        let expected = ActionError::Process(ProcessError::ProcessTerminated { id: pid("A") });
        assert_eq!(p.record_internal("y").unwrap_err(), expected);
        assert_eq!(
            p.stamp_send(pid("B"), Payload::empty()).unwrap_err(),
            expected
        );
        let m = Message::new(pid("B"), pid("A"), 9, Payload::empty());
        assert_eq!(p.on_receive(&m).unwrap_err(), expected);
        assert_eq!(p.log().len(), 1);
    }

    #[test]
    fn log_strictly_increases_across_mixed_actions() {
        let mut a = ProcessState::new(pid("A"));
        let mut b = ProcessState::new(pid("B"));
        for i in 0..10u64 {
            let (_, m) = a.stamp_send(pid("B"), Payload::empty()).unwrap();
            if i % 3 == 0 {
                b.record_internal("tick").unwrap();
            }
            b.on_receive(&m).unwrap();
        }
        assert!(a.check().is_ok());
        assert!(b.check().is_ok());
    }

    #[test]
    fn receive_of_saturated_stamp_is_an_invariant_violation() {
        let mut b = ProcessState::new(pid("B"));
        let m = Message::new(pid("A"), pid("B"), u64::MAX, Payload::empty());
        assert_eq!(
            b.on_receive(&m).unwrap_err(),
            ActionError::Invariant(InvariantViolation::CounterOverflow { owner: pid("B") })
        );
        assert!(b.log().is_empty());
        assert_eq!(b.clock().value(), 0);
    }

    #[test]
    fn check_log_flags_non_increasing() {
        let log = vec![
            Event::new(EventLabel::Internal("a".into()), LamportClock::at(pid("A"), 2)),
            Event::new(EventLabel::Internal("b".into()), LamportClock::at(pid("A"), 2)),
        ];
        assert_eq!(
            check_log(&pid("A"), &log),
            Err(InvariantViolation::NonIncreasingLog {
                owner: pid("A"),
                last: 2,
                next: 2
            })
        );
    }

    #[test]
    fn check_log_flags_foreign_event() {
        let log = vec![Event::new(
            EventLabel::Internal("a".into()),
            LamportClock::at(pid("B"), 1),
        )];
        assert_eq!(
            check_log(&pid("A"), &log),
            Err(InvariantViolation::ForeignEvent {
                owner: pid("A"),
                found: pid("B")
            })
        );
    }
}
