//! User-facing [`System`] API and shutdown sequence.
//!
//! # Architecture
//!
//! ```text
//! Driver                     Process thread A            Process thread B
//!   |                              |                           |
//!   |--start("A", task)----------->| run task                  |
//!   |                              | ctx.send("B", ..)         |
//!   |                              |  stamp, log, hand off --->| mailbox
//!   |                              |                           | drain before next step:
//!   |                              |                           |  merge, log receipt
//!   |--handle.record_internal()--->| [control: reply channel]  |
//!   |<--event via reply------------|                           |
//!   |                              |                           |
//!   |--quiesce(): tasks done, nothing in flight                |
//!   |--shutdown(): Stop ---------->| retire                    | retire
//!   |<--logs via JoinHandle--------|---------------------------|
//!   |--total_order(logs)                                       |
//! ```

use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use lamport_core::{Event, EventOrder, ProcessError, ProcessId};
use tracing::{info, warn};

use crate::actor::{ProcessActor, ProcessContext, ProcessOutcome, Task};
use crate::config::{ConfigError, SystemConfig};
use crate::directory::{self, Counters, Directory, SystemStats};
use crate::handle::ProcessHandle;

/// Interval between quiescence checks.
const QUIESCE_POLL: Duration = Duration::from_millis(1);

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`System::shutdown`].
#[derive(Debug)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Time spent waiting for quiescence.
    pub quiesce_ms: u64,
    /// Whether the system went quiet within the shutdown budget.
    pub quiesced: bool,
    /// Number of process threads joined normally.
    pub joined: usize,
    /// Processes whose thread panicked (task panic or invariant violation).
    pub panicked: Vec<ProcessId>,
    /// Tasks that returned an error.
    pub task_errors: Vec<(ProcessId, ProcessError)>,
    /// Final log of every joined process, in start order.
    pub logs: IndexMap<ProcessId, Vec<Event>>,
    /// Counters at the end of the sequence.
    pub stats: SystemStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SystemState {
    Running,
    Stopped,
}

// ── System ───────────────────────────────────────────────────────

/// A set of simulated processes and the registry that connects them.
///
/// Owns the identity-to-mailbox mapping; processes find each other only
/// through it. Dropping a running system shuts it down.
pub struct System {
    config: SystemConfig,
    directory: Arc<Directory>,
    counters: Arc<Counters>,
    handles: IndexMap<ProcessId, ProcessHandle>,
    threads: IndexMap<ProcessId, JoinHandle<ProcessOutcome>>,
    final_logs: IndexMap<ProcessId, Vec<Event>>,
    state: SystemState,
}

/// A process registered in the directory but not yet running.
struct Prepared {
    id: ProcessId,
    actor: ProcessActor,
    handle: ProcessHandle,
}

impl System {
    /// Validate `config` and create an empty system.
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            directory: Arc::new(Directory::new()),
            counters: Arc::new(Counters::default()),
            handles: IndexMap::new(),
            threads: IndexMap::new(),
            final_logs: IndexMap::new(),
            state: SystemState::Running,
        })
    }

    /// The configuration this system was built with.
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Start one process running `task`.
    ///
    /// The process is reachable by name as soon as this returns. A task
    /// that sends to a process started later may see `UnknownRecipient`;
    /// use [`launch`](Self::launch) to make a group reachable before any
    /// of its tasks run.
    pub fn start<F>(&mut self, id: impl Into<ProcessId>, task: F) -> Result<ProcessHandle, ConfigError>
    where
        F: FnOnce(&mut ProcessContext<'_>) -> Result<(), ProcessError> + Send + 'static,
    {
        let prepared = self.prepare(id.into())?;
        self.spawn(prepared, Box::new(task))
    }

    /// Start a group of processes, registering every mailbox first.
    ///
    /// Either all identities are registered or none are.
    pub fn launch<I, P>(&mut self, processes: I) -> Result<Vec<ProcessHandle>, ConfigError>
    where
        I: IntoIterator<Item = (P, Task)>,
        P: Into<ProcessId>,
    {
        let mut prepared = Vec::new();
        for (id, task) in processes {
            match self.prepare(id.into()) {
                Ok(p) => prepared.push((p, task)),
                Err(e) => {
                    for (p, _) in prepared {
                        self.unregister(&p.id);
                    }
                    return Err(e);
                }
            }
        }

        let mut handles = Vec::with_capacity(prepared.len());
        let mut pending = prepared.into_iter();
        while let Some((p, task)) = pending.next() {
            match self.spawn(p, task) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for (p, _) in pending {
                        self.unregister(&p.id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles)
    }

    fn prepare(&mut self, id: ProcessId) -> Result<Prepared, ConfigError> {
        if id.as_str().is_empty() {
            return Err(ConfigError::EmptyIdentity);
        }
        if self.handles.contains_key(&id) {
            return Err(ConfigError::DuplicateProcess { id });
        }
        let (mail_tx, mail_rx) = directory::mailbox(self.config.mailbox_capacity);
        self.directory.register(id.clone(), mail_tx)?;

        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let final_log = Arc::new(OnceLock::new());
        let actor = ProcessActor::new(
            id.clone(),
            mail_rx,
            control_rx,
            Arc::clone(&self.directory),
            Arc::clone(&self.counters),
            self.config.after_task,
            Arc::clone(&final_log),
        );
        let handle = ProcessHandle::new(id.clone(), control_tx, final_log);
        Ok(Prepared { id, actor, handle })
    }

    fn spawn(&mut self, prepared: Prepared, task: Task) -> Result<ProcessHandle, ConfigError> {
        let Prepared { id, actor, handle } = prepared;

        // Counted before the thread exists so quiesce() never sees a gap.
        self.counters.task_started();
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_prefix, id))
            .spawn(move || actor.run(task));

        match spawned {
            Ok(thread) => {
                info!(process = %id, "process spawned");
                self.threads.insert(id.clone(), thread);
                self.handles.insert(id, handle.clone());
                Ok(handle)
            }
            Err(e) => {
                self.counters.task_finished();
                self.unregister(&id);
                Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("process '{id}': {e}"),
                })
            }
        }
    }

    fn unregister(&self, id: &ProcessId) {
        while !self.directory.try_remove(id) {
            thread::yield_now();
        }
    }

    /// Handle for a started process.
    pub fn handle(&self, id: &str) -> Option<&ProcessHandle> {
        self.handles.get(id)
    }

    /// Identities of every started process, in start order.
    pub fn ids(&self) -> Vec<ProcessId> {
        self.handles.keys().cloned().collect()
    }

    /// Whether `id` can currently receive messages.
    pub fn is_live(&self, id: &str) -> bool {
        self.directory.contains(&ProcessId::new(id))
    }

    /// Current counters.
    pub fn stats(&self) -> SystemStats {
        self.counters.snapshot()
    }

    /// No task is running and every sent message has been applied.
    pub fn is_quiet(&self) -> bool {
        self.counters.is_quiet()
    }

    /// Wait until the system is quiet or `timeout` elapses.
    ///
    /// Returns whether it went quiet. Only tasks and handle requests
    /// send messages, so once quiet the system stays quiet until the
    /// driver acts again.
    pub fn quiesce(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.counters.is_quiet() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(QUIESCE_POLL);
        }
    }

    /// Snapshot of every process's log, in start order.
    ///
    /// Processes that died without publishing a log are skipped.
    pub fn logs(&self) -> IndexMap<ProcessId, Vec<Event>> {
        if self.state == SystemState::Stopped {
            return self.final_logs.clone();
        }
        let mut logs = IndexMap::with_capacity(self.handles.len());
        for (id, handle) in &self.handles {
            match handle.log() {
                Ok(log) => {
                    logs.insert(id.clone(), log);
                }
                Err(e) => warn!(process = %id, error = %e, "log unavailable"),
            }
        }
        logs
    }

    /// Comparator under the configured ranking and direction.
    pub fn event_order(&self) -> EventOrder {
        EventOrder::new(self.config.ranking.clone()).with_direction(self.config.direction)
    }

    /// Every logged event, linearized under the configured ranking.
    pub fn total_order(&self) -> Vec<Event> {
        self.event_order().sort(self.logs().into_values())
    }

    /// Wait for quiescence, stop every process, join all threads.
    ///
    /// 1. **Quiesce (≤ `shutdown_budget_ms`):** let tasks finish and
    ///    in-flight messages land.
    /// 2. **Stop:** ask every process to stop between actions; blocked
    ///    `receive()` calls fail with `ProcessTerminated`.
    /// 3. **Join:** collect final logs; panicked threads are reported.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == SystemState::Stopped {
            return ShutdownReport {
                total_ms: 0,
                quiesce_ms: 0,
                quiesced: true,
                joined: 0,
                panicked: Vec::new(),
                task_errors: Vec::new(),
                logs: self.final_logs.clone(),
                stats: self.counters.snapshot(),
            };
        }

        let start = Instant::now();

        // Phase 1: quiesce
        let quiesced = self.quiesce(Duration::from_millis(self.config.shutdown_budget_ms));
        let quiesce_ms = start.elapsed().as_millis() as u64;
        if !quiesced {
            warn!(stats = ?self.counters.snapshot(), "shutdown budget elapsed before quiescence");
        }

        // Phase 2: stop
        for handle in self.handles.values() {
            handle.stop();
        }

        // Phase 3: join
        let mut joined = 0;
        let mut panicked = Vec::new();
        let mut task_errors = Vec::new();
        for (id, thread) in self.threads.drain(..) {
            match thread.join() {
                Ok(outcome) => {
                    joined += 1;
                    if let Err(e) = outcome.task_result {
                        task_errors.push((id.clone(), e));
                    }
                    self.final_logs.insert(id, outcome.log);
                }
                Err(_) => {
                    warn!(process = %id, "process thread panicked");
                    panicked.push(id);
                }
            }
        }
        self.state = SystemState::Stopped;

        let total_ms = start.elapsed().as_millis() as u64;
        info!(joined, panicked = panicked.len(), total_ms, "system shut down");
        ShutdownReport {
            total_ms,
            quiesce_ms,
            quiesced,
            joined,
            panicked,
            task_errors,
            logs: self.final_logs.clone(),
            stats: self.counters.snapshot(),
        }
    }
}

impl Drop for System {
    fn drop(&mut self) {
        if self.state != SystemState::Stopped {
            self.shutdown();
        }
    }
}
