//! Driver-side handle to a running process.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use lamport_core::{Event, Payload, ProcessError, ProcessId};

use crate::actor::Control;

/// How long a request waits between checks for process termination.
const REPLY_POLL: Duration = Duration::from_millis(50);

/// Lets the driver act on a process from outside its thread.
///
/// Requests queue behind whatever the process is doing and are served
/// between task steps or while the process is idle, so they never
/// interleave with the process's own actions. Each call blocks until the
/// process replies.
#[derive(Clone)]
pub struct ProcessHandle {
    id: ProcessId,
    control: Sender<Control>,
    final_log: Arc<OnceLock<Vec<Event>>>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("id", &self.id)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl ProcessHandle {
    pub(crate) fn new(
        id: ProcessId,
        control: Sender<Control>,
        final_log: Arc<OnceLock<Vec<Event>>>,
    ) -> Self {
        Self {
            id,
            control,
            final_log,
        }
    }

    /// The process identity.
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Whether the process has retired.
    pub fn is_terminated(&self) -> bool {
        self.final_log.get().is_some()
    }

    /// Record a local step on the process.
    pub fn record_internal(&self, label: impl Into<String>) -> Result<Event, ProcessError> {
        let label = label.into();
        self.request(|reply| Control::RecordInternal { label, reply })?
    }

    /// Have the process send `payload` to `to`.
    pub fn send(
        &self,
        to: impl Into<ProcessId>,
        payload: impl Into<Payload>,
    ) -> Result<Event, ProcessError> {
        let to = to.into();
        let payload = payload.into();
        self.request(|reply| Control::Send { to, payload, reply })?
    }

    /// Snapshot of the process's log in insertion order.
    ///
    /// Still available after the process terminates.
    pub fn log(&self) -> Result<Vec<Event>, ProcessError> {
        if let Some(log) = self.final_log.get() {
            return Ok(log.clone());
        }
        match self.request(|reply| Control::Log { reply }) {
            Ok(log) => Ok(log),
            Err(e) => self.final_log.get().cloned().ok_or(e),
        }
    }

    /// Ask the process to stop between actions.
    pub(crate) fn stop(&self) {
        // Disconnected means it already exited.
        let _ = self.control.send(Control::Stop);
    }

    fn terminated(&self) -> ProcessError {
        ProcessError::ProcessTerminated {
            id: self.id.clone(),
        }
    }

    /// Send a request and wait for its reply.
    ///
    /// Gives up once the process has retired without answering.
    fn request<T>(
        &self,
        build: impl FnOnce(Sender<T>) -> Control,
    ) -> Result<T, ProcessError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.control
            .send(build(reply_tx))
            .map_err(|_| self.terminated())?;
        loop {
            match reply_rx.recv_timeout(REPLY_POLL) {
                Ok(v) => return Ok(v),
                Err(RecvTimeoutError::Disconnected) => return Err(self.terminated()),
                Err(RecvTimeoutError::Timeout) => {
                    if self.is_terminated() {
                        // One last look: the reply may have raced the retirement.
                        return reply_rx.try_recv().map_err(|_| self.terminated());
                    }
                }
            }
        }
    }
}
