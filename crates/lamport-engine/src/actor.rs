//! Process thread: mailbox draining, task execution, idle loop and
//! retirement.
//!
//! Each process thread owns its [`ProcessState`] exclusively (moved in
//! via `thread::spawn`). No locks guard the clock or log: inbound
//! messages arrive on the process's mailbox channel, driver requests on
//! its control channel with per-request reply channels.
//!
//! Receipt pre-empts the task: every [`ProcessContext`] call first
//! applies all queued messages, so a message that has arrived is always
//! stamped before the next step of the task.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use lamport_core::{
    ActionError, Event, InvariantViolation, LamportClock, Message, Payload, ProcessError,
    ProcessId,
};
use tracing::{debug, error, info, warn};

use crate::config::AfterTask;
use crate::directory::{Counters, Directory};
use crate::process::ProcessState;

/// How long a sender waits on its own mailbox between hand-off attempts
/// to a full peer mailbox.
const SEND_RETRY: Duration = Duration::from_millis(1);

/// A process's programmed work.
///
/// Runs once on the process thread. Returning ends the task; what
/// happens next is set by [`AfterTask`].
pub type Task = Box<dyn FnOnce(&mut ProcessContext<'_>) -> Result<(), ProcessError> + Send>;

/// Box a closure as a [`Task`].
pub fn task<F>(f: F) -> Task
where
    F: FnOnce(&mut ProcessContext<'_>) -> Result<(), ProcessError> + Send + 'static,
{
    Box::new(f)
}

/// Driver request, paired with a reply channel where one is expected.
pub(crate) enum Control {
    RecordInternal {
        label: String,
        reply: Sender<Result<Event, ProcessError>>,
    },
    Send {
        to: ProcessId,
        payload: Payload,
        reply: Sender<Result<Event, ProcessError>>,
    },
    Log {
        reply: Sender<Vec<Event>>,
    },
    Stop,
}

/// A message applied by this process, with the receive event it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    message: Message,
    event: Event,
}

impl Delivery {
    /// The delivered message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The `received from` event logged for it.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The sender.
    pub fn from(&self) -> &ProcessId {
        self.message.sender()
    }

    /// The opaque body.
    pub fn payload(&self) -> &Payload {
        self.message.payload()
    }
}

/// What a process thread leaves behind when it exits normally.
#[derive(Debug)]
pub(crate) struct ProcessOutcome {
    pub log: Vec<Event>,
    pub task_result: Result<(), ProcessError>,
}

enum Wake {
    Mail(Option<Message>),
    Control(Option<Control>),
    Timeout,
}

/// Everything a process thread owns.
pub(crate) struct ProcessActor {
    state: ProcessState,
    mailbox: Receiver<Message>,
    control: Receiver<Control>,
    directory: Arc<Directory>,
    counters: Arc<Counters>,
    after_task: AfterTask,
    final_log: Arc<OnceLock<Vec<Event>>>,
    /// Deliveries not yet read by the task. Only filled while it runs.
    inbox: VecDeque<Delivery>,
    task_running: bool,
    stop_requested: bool,
}

impl ProcessActor {
    pub fn new(
        id: ProcessId,
        mailbox: Receiver<Message>,
        control: Receiver<Control>,
        directory: Arc<Directory>,
        counters: Arc<Counters>,
        after_task: AfterTask,
        final_log: Arc<OnceLock<Vec<Event>>>,
    ) -> Self {
        Self {
            state: ProcessState::new(id),
            mailbox,
            control,
            directory,
            counters,
            after_task,
            final_log,
            inbox: VecDeque::new(),
            task_running: false,
            stop_requested: false,
        }
    }

    /// Thread body. The caller has already counted the task as running.
    pub fn run(mut self, task: Task) -> ProcessOutcome {
        let mut guard = ActorGuard {
            id: self.state.id().clone(),
            directory: Arc::clone(&self.directory),
            counters: Arc::clone(&self.counters),
            mailbox: self.mailbox.clone(),
            task_pending: true,
            retired: false,
        };
        info!(process = %self.state.id(), "process started");

        self.task_running = true;
        let task_result = task(&mut ProcessContext { actor: &mut self });
        self.task_running = false;
        self.inbox.clear();
        guard.task_finished();

        match &task_result {
            Ok(()) => info!(process = %self.state.id(), "task completed"),
            Err(e) => warn!(process = %self.state.id(), error = %e, "task ended with error"),
        }

        if self.after_task == AfterTask::Linger && !self.stop_requested {
            self.idle();
        }
        self.retire();
        guard.retired = true;

        ProcessOutcome {
            log: self.state.log().to_vec(),
            task_result,
        }
    }

    fn ensure_running(&self) -> Result<(), ProcessError> {
        if self.stop_requested || self.state.is_terminated() {
            return Err(ProcessError::ProcessTerminated {
                id: self.state.id().clone(),
            });
        }
        Ok(())
    }

    /// Unwrap an action result, aborting the thread on an invariant violation.
    fn settle<T>(&self, result: Result<T, ActionError>) -> Result<T, ProcessError> {
        match result {
            Ok(v) => Ok(v),
            Err(ActionError::Process(e)) => Err(e),
            Err(ActionError::Invariant(v)) => self.fatal(v),
        }
    }

    fn fatal(&self, violation: InvariantViolation) -> ! {
        error!(process = %self.state.id(), %violation, "invariant violated, aborting process");
        panic!("{violation}");
    }

    // ── Actions ──────────────────────────────────────────────────

    fn record_internal(&mut self, label: String) -> Result<Event, ProcessError> {
        self.ensure_running()?;
        let result = self.state.record_internal(label);
        let event = self.settle(result)?;
        self.counters.event_recorded();
        debug!(process = %self.state.id(), counter = event.counter(), label = %event.label(), "internal event");
        Ok(event)
    }

    fn send(&mut self, to: ProcessId, payload: Payload) -> Result<Event, ProcessError> {
        self.ensure_running()?;

        if &to == self.state.id() {
            let result = self.state.stamp_send(to, payload);
            let (event, message) = self.settle(result)?;
            self.counters.event_recorded();
            self.counters.message_sent();
            debug!(process = %self.state.id(), counter = event.counter(), "sent to self");
            self.deliver(message);
            return Ok(event);
        }

        // Stamp and first hand-off under the directory read lock, so an
        // unknown recipient is rejected before the clock moves and the
        // receiver cannot retire in between. Never block under the lock.
        let directory = Arc::clone(&self.directory);
        let stamped = directory.with_mailbox(&to, |mailbox| {
            let result = self.state.stamp_send(to.clone(), payload);
            let (event, message) = self.settle(result)?;
            self.counters.event_recorded();
            self.counters.message_sent();
            Ok((event, mailbox.try_send(message)))
        });

        let (event, mut attempt) = match stamped {
            Some(Ok(stamped)) => stamped,
            Some(Err(e)) => {
                warn!(process = %self.state.id(), to = %to, error = %e, "send failed");
                return Err(e);
            }
            None => {
                warn!(process = %self.state.id(), to = %to, "send rejected: unknown recipient");
                return Err(ProcessError::UnknownRecipient { to });
            }
        };

        loop {
            let message = match attempt {
                Ok(()) => {
                    debug!(process = %self.state.id(), counter = event.counter(), to = %to, "sent");
                    return Ok(event);
                }
                Err(TrySendError::Full(message)) => message,
                Err(TrySendError::Disconnected(_)) => {
                    // Receiver thread unwound without retiring.
                    self.counters.message_bounced();
                    warn!(process = %self.state.id(), to = %to, "send failed: recipient gone");
                    return Err(ProcessError::UnknownRecipient { to });
                }
            };

            self.wait_for_room();
            match self
                .directory
                .with_mailbox(&to, move |mailbox| mailbox.try_send(message))
            {
                Some(next) => attempt = next,
                None => {
                    // Retired while we waited; the send event stays logged.
                    self.counters.message_bounced();
                    warn!(process = %self.state.id(), to = %to, "send failed: recipient retired");
                    return Err(ProcessError::UnknownRecipient { to });
                }
            }
        }
    }

    /// Keep applying inbound mail while a peer's mailbox is full.
    fn wait_for_room(&mut self) {
        self.drain_mailbox();
        if let Ok(message) = self.mailbox.recv_timeout(SEND_RETRY) {
            self.deliver(message);
        }
    }

    fn deliver(&mut self, message: Message) {
        let result = self.state.on_receive(&message);
        match result {
            Ok(event) => {
                self.counters.event_recorded();
                self.counters.message_delivered();
                debug!(
                    process = %self.state.id(),
                    from = %message.sender(),
                    sent_at = message.counter(),
                    counter = event.counter(),
                    "received"
                );
                if self.task_running {
                    self.inbox.push_back(Delivery { message, event });
                }
            }
            Err(ActionError::Process(e)) => {
                warn!(process = %self.state.id(), error = %e, "dropping message");
                self.counters.message_lost();
            }
            Err(ActionError::Invariant(v)) => self.fatal(v),
        }
    }

    // ── Channel servicing ────────────────────────────────────────

    fn drain_mailbox(&mut self) {
        while let Ok(message) = self.mailbox.try_recv() {
            self.deliver(message);
        }
    }

    /// Apply every queued message, then every queued driver request.
    fn pump(&mut self) {
        self.drain_mailbox();
        while let Ok(control) = self.control.try_recv() {
            self.serve(control);
            self.drain_mailbox();
        }
    }

    fn serve(&mut self, control: Control) {
        match control {
            Control::RecordInternal { label, reply } => {
                let result = self.record_internal(label);
                // Best-effort: the caller may have given up waiting.
                let _ = reply.send(result);
            }
            Control::Send { to, payload, reply } => {
                let result = self.send(to, payload);
                let _ = reply.send(result);
            }
            Control::Log { reply } => {
                let _ = reply.send(self.state.log().to_vec());
            }
            Control::Stop => self.stop_requested = true,
        }
    }

    /// Block until either channel has something, or `deadline` passes.
    fn wait(&self, deadline: Option<Instant>) -> Wake {
        let mailbox = &self.mailbox;
        let control = &self.control;
        match deadline {
            None => select! {
                recv(mailbox) -> m => Wake::Mail(m.ok()),
                recv(control) -> c => Wake::Control(c.ok()),
            },
            Some(at) => select! {
                recv(mailbox) -> m => Wake::Mail(m.ok()),
                recv(control) -> c => Wake::Control(c.ok()),
                default(at.saturating_duration_since(Instant::now())) => Wake::Timeout,
            },
        }
    }

    fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Mail(Some(message)) => self.deliver(message),
            Wake::Control(Some(control)) => {
                self.drain_mailbox();
                self.serve(control);
            }
            // Every handle and the system are gone: nobody can stop us later.
            Wake::Mail(None) | Wake::Control(None) => self.stop_requested = true,
            Wake::Timeout => {}
        }
    }

    fn wait_for_delivery(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<Delivery>, ProcessError> {
        loop {
            self.pump();
            if let Some(delivery) = self.inbox.pop_front() {
                return Ok(Some(delivery));
            }
            self.ensure_running()?;
            match self.wait(deadline) {
                Wake::Timeout => return Ok(None),
                wake => self.handle_wake(wake),
            }
        }
    }

    /// Service the mailbox and driver requests after the task returned.
    fn idle(&mut self) {
        debug!(process = %self.state.id(), "idle");
        while !self.stop_requested {
            let wake = self.wait(None);
            self.handle_wake(wake);
        }
    }

    /// Leave the directory, apply what is already queued, terminate.
    fn retire(&mut self) {
        let id = self.state.id().clone();
        loop {
            self.drain_mailbox();
            if self.directory.try_remove(&id) {
                break;
            }
            thread::yield_now();
        }
        self.drain_mailbox();
        self.state.terminate();

        while let Ok(control) = self.control.try_recv() {
            match control {
                Control::RecordInternal { reply, .. } | Control::Send { reply, .. } => {
                    let _ = reply.send(Err(ProcessError::ProcessTerminated { id: id.clone() }));
                }
                Control::Log { reply } => {
                    let _ = reply.send(self.state.log().to_vec());
                }
                Control::Stop => {}
            }
        }

        let _ = self.final_log.set(self.state.log().to_vec());
        info!(process = %id, events = self.state.log().len(), "process terminated");
    }
}

// ── ActorGuard ───────────────────────────────────────────────────

/// Keeps the system counters and directory consistent if a process
/// thread unwinds (task panic or invariant violation).
struct ActorGuard {
    id: ProcessId,
    directory: Arc<Directory>,
    counters: Arc<Counters>,
    mailbox: Receiver<Message>,
    task_pending: bool,
    retired: bool,
}

impl ActorGuard {
    fn task_finished(&mut self) {
        if self.task_pending {
            self.task_pending = false;
            self.counters.task_finished();
        }
    }
}

impl Drop for ActorGuard {
    fn drop(&mut self) {
        self.task_finished();
        if self.retired {
            return;
        }
        loop {
            while self.mailbox.try_recv().is_ok() {
                self.counters.message_lost();
            }
            if self.directory.try_remove(&self.id) {
                break;
            }
            thread::yield_now();
        }
        while self.mailbox.try_recv().is_ok() {
            self.counters.message_lost();
        }
    }
}

// ── ProcessContext ───────────────────────────────────────────────

/// The API a [`Task`] uses to act as its process.
///
/// Every call first applies all messages already in the mailbox, then
/// any pending driver requests, before doing its own work.
///
/// Applied messages are also kept, with their receive events, until the
/// task reads them with one of the `receive` calls. A long-running task
/// that never reads should call [`discard_unread`](Self::discard_unread)
/// now and then; the events stay in the log either way.
pub struct ProcessContext<'a> {
    actor: &'a mut ProcessActor,
}

impl ProcessContext<'_> {
    /// This process's identity.
    pub fn id(&self) -> &ProcessId {
        self.actor.state.id()
    }

    /// The current clock.
    pub fn clock(&self) -> &LamportClock {
        self.actor.state.clock()
    }

    /// Events logged so far, in insertion order.
    pub fn log(&self) -> &[Event] {
        self.actor.state.log()
    }

    /// Record a local step.
    pub fn record_internal(&mut self, label: impl Into<String>) -> Result<Event, ProcessError> {
        self.actor.pump();
        self.actor.record_internal(label.into())
    }

    /// Stamp a send and hand the message to `to`'s mailbox.
    ///
    /// Fails with `UnknownRecipient` without touching the clock if `to`
    /// is not live.
    pub fn send(
        &mut self,
        to: impl Into<ProcessId>,
        payload: impl Into<Payload>,
    ) -> Result<Event, ProcessError> {
        self.actor.pump();
        self.actor.send(to.into(), payload.into())
    }

    /// Block until a message has been applied and return it.
    ///
    /// Fails with `ProcessTerminated` if the system stops this process
    /// while waiting.
    pub fn receive(&mut self) -> Result<Delivery, ProcessError> {
        loop {
            if let Some(delivery) = self.actor.wait_for_delivery(None)? {
                return Ok(delivery);
            }
        }
    }

    /// Like [`receive`](Self::receive), giving up after `timeout`.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<Delivery>, ProcessError> {
        self.actor.wait_for_delivery(Some(Instant::now() + timeout))
    }

    /// The oldest unread delivery, without blocking.
    pub fn try_receive(&mut self) -> Result<Option<Delivery>, ProcessError> {
        self.actor.pump();
        if let Some(delivery) = self.actor.inbox.pop_front() {
            return Ok(Some(delivery));
        }
        self.actor.ensure_running()?;
        Ok(None)
    }

    /// Number of applied messages the task has not read yet.
    pub fn unread(&self) -> usize {
        self.actor.inbox.len()
    }

    /// Apply queued messages, then drop every unread delivery.
    ///
    /// Returns how many were dropped.
    pub fn discard_unread(&mut self) -> usize {
        self.actor.pump();
        let dropped = self.actor.inbox.len();
        self.actor.inbox.clear();
        dropped
    }
}
