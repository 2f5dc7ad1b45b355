/// Background task executor. Runs named, potentially slow scanner calls on
/// worker threads and hands their results back to one coordination thread.
///
/// # Model
///
/// - The executor is owned by the coordinator (UI loop, headless sweep) and is
///   only ever touched from that thread. Callbacks therefore need not be `Send`
///   and may freely mutate coordinator-local state.
/// - Each [`submit`](TaskExecutor::submit) spawns one named worker thread. At
///   most one live worker is bound to a task id; resubmitting an id cancels the
///   previous worker first.
/// - Workers report through an unbounded crossbeam channel. Every submission
///   carries a fresh *generation*; a completion whose generation no longer
///   matches the registry (superseded or detached) is dropped, so a late
///   result can never overwrite a newer one.
/// - Each worker also owns the sender of a zero-capacity "finished" channel.
///   The sender drops when the thread exits (normally or by unwinding), which
///   disconnects the channel; `cancel` bounded-waits on exactly that.
///
/// # Cancellation
///
/// Cooperative first: the task's [`CancelSignal`] is set and the worker gets
/// [`DEFAULT_GRACE_PERIOD`] (configurable) to return. A worker that returns in
/// time has its (usually partial) result delivered like any other. Threads are
/// never killed. A worker that ignores the signal is detached. It may keep
/// running until it finishes naturally, and its result is discarded.
/// Resubmitting an id discards the previous run's result either way.
pub mod result;
pub mod signal;
pub mod task;

pub use result::{Delivered, TaskResult};
pub use signal::{CancelSignal, Checkpoint};
pub use task::TaskFn;

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long `cancel` waits for a worker to honour its signal before detaching it.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(1_000);

/// Completion callback, invoked on the coordination thread.
pub type Callback<T> = Box<dyn FnOnce(&TaskResult<T>)>;

/// Message sent from a worker thread when its task function returns.
struct Completion<T> {
    task_id: String,
    generation: u64,
    result: TaskResult<T>,
}

/// Registry entry for a task whose result has not been delivered yet.
struct LiveTask<T> {
    generation: u64,
    /// Present only for tasks built with `TaskFn::cancellable`.
    cancel: Option<CancelSignal>,
    /// Disconnects when the worker thread exits.
    finished_rx: Receiver<()>,
    thread: Option<JoinHandle<()>>,
    on_complete: Option<Callback<T>>,
}

impl<T> LiveTask<T> {
    fn has_exited(&self) -> bool {
        matches!(self.finished_rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// A cancelled run whose worker has exited and whose result is queued.
struct Stopped<T> {
    generation: u64,
    on_complete: Option<Callback<T>>,
}

/// Owned registry of named background tasks and their last results.
pub struct TaskExecutor<T> {
    tasks: HashMap<String, LiveTask<T>>,
    stopped: HashMap<String, Stopped<T>>,
    results: HashMap<String, Arc<TaskResult<T>>>,
    completion_tx: Sender<Completion<T>>,
    completion_rx: Receiver<Completion<T>>,
    next_generation: u64,
    grace_period: Duration,
}

impl<T: Send + 'static> Default for TaskExecutor<T> {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl<T: Send + 'static> TaskExecutor<T> {
    pub fn new(grace_period: Duration) -> Self {
        // Unbounded: a worker must never block on send while the coordinator
        // is itself blocked in `cancel` waiting for that worker. Each task
        // sends at most one message, so the queue is bounded by task count.
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        Self {
            tasks: HashMap::new(),
            stopped: HashMap::new(),
            results: HashMap::new(),
            completion_tx,
            completion_rx,
            next_generation: 0,
            grace_period,
        }
    }

    pub fn with_config(config: &ExecutorConfig) -> Self {
        Self::new(config.grace_period())
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Start `task` on a new worker bound to `task_id`.
    ///
    /// Any live task with the same id is stopped first (synchronously, up to
    /// the grace period) and will never be delivered, nor will a cancelled run
    /// of that id still awaiting delivery. Returns as soon as the worker is
    /// spawned; the result arrives later through
    /// [`process_completions`](Self::process_completions).
    pub fn submit(
        &mut self,
        task_id: impl Into<String>,
        task: TaskFn<T>,
        on_complete: Option<Callback<T>>,
    ) -> Result<(), ExecutorError> {
        let task_id = task_id.into();
        let superseded_live = self.stop(&task_id, false);
        let superseded_stopped = self.stopped.remove(&task_id).is_some();
        if superseded_live || superseded_stopped {
            debug!(task = %task_id, "superseded previous run");
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = task.supports_cancellation().then(CancelSignal::new);
        let worker_signal = cancel.clone();
        let (finished_tx, finished_rx) = crossbeam_channel::bounded::<()>(0);
        let completion_tx = self.completion_tx.clone();
        let worker_id = task_id.clone();

        let thread = thread::Builder::new()
            .name(format!("lapcare-{}", task_id.replace('\0', "")))
            .spawn(move || {
                // Dropped last, after the completion is queued.
                let _finished = finished_tx;
                let result = task.run(worker_signal.as_ref());
                let _ = completion_tx.send(Completion {
                    task_id: worker_id,
                    generation,
                    result,
                });
            })
            .map_err(|source| ExecutorError::Spawn {
                task_id: task_id.clone(),
                source,
            })?;

        debug!(task = %task_id, generation, cancellable = cancel.is_some(), "task started");
        self.tasks.insert(
            task_id,
            LiveTask {
                generation,
                cancel,
                finished_rx,
                thread: Some(thread),
                on_complete,
            },
        );
        Ok(())
    }

    /// Stop the live task bound to `task_id`.
    ///
    /// Sets the cancellation signal (if the task has one) and waits up to the
    /// grace period for the worker to exit. A worker that exits in time is
    /// delivered by the next [`process_completions`](Self::process_completions)
    /// with whatever it returned, typically a partial result. A worker that
    /// does not is detached and its result dropped. The id is free for reuse
    /// when this returns. Returns `false` for an unknown id.
    pub fn cancel(&mut self, task_id: &str) -> bool {
        self.stop(task_id, true)
    }

    /// Signal, bounded-wait, then join or detach. With `keep_result`, a worker
    /// that exited in time stays eligible for delivery.
    fn stop(&mut self, task_id: &str, keep_result: bool) -> bool {
        let Some(mut live) = self.tasks.remove(task_id) else {
            return false;
        };

        if let Some(signal) = &live.cancel {
            signal.cancel();
        }

        match live.finished_rx.recv_timeout(self.grace_period) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    task = %task_id,
                    grace_ms = self.grace_period.as_millis() as u64,
                    "worker did not stop within grace period; detaching"
                );
                // Dropping the JoinHandle detaches the thread.
                drop(live.thread.take());
            }
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if let Some(thread) = live.thread.take() {
                    let _ = thread.join();
                }
                debug!(task = %task_id, keep_result, "task cancelled");
                if keep_result {
                    // The worker queued its completion before exiting.
                    self.stopped.insert(
                        task_id.to_string(),
                        Stopped {
                            generation: live.generation,
                            on_complete: live.on_complete.take(),
                        },
                    );
                }
            }
        }
        true
    }

    /// Cancel every live task. Runs that stop in time are still delivered by
    /// the next drain.
    pub fn shutdown(&mut self) {
        let ids: Vec<String> = self.tasks.keys().cloned().collect();
        for id in ids {
            self.cancel(&id);
        }
    }

    /// Last delivered result for `task_id`, if it ever completed.
    pub fn get_result(&self, task_id: &str) -> Option<Arc<TaskResult<T>>> {
        self.results.get(task_id).cloned()
    }

    /// `true` while a worker bound to `task_id` is still executing.
    pub fn is_running(&self, task_id: &str) -> bool {
        self.tasks
            .get(task_id)
            .is_some_and(|live| !live.has_exited())
    }

    /// `true` while any submitted or cancelled task is awaiting delivery.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty() || !self.stopped.is_empty()
    }

    /// Ids whose worker is still executing, sorted. Agrees with
    /// [`is_running`](Self::is_running).
    pub fn running_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, live)| !live.has_exited())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids with a result still to be delivered, finished or not, sorted.
    pub fn pending_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks
            .keys()
            .chain(self.stopped.keys())
            .cloned()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Deliver every completion that has arrived, without blocking.
    ///
    /// Call once per frame / loop iteration from the coordination thread.
    /// For each delivered task the result is cached, its callback runs, and it
    /// is included in the returned list.
    pub fn process_completions(&mut self) -> Vec<Delivered<T>> {
        let mut delivered = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            delivered.extend(self.deliver(completion));
        }
        delivered
    }

    /// Block until at least one result is delivered, nothing is pending, or
    /// `timeout` elapses.
    pub fn wait_for_completions(&mut self, timeout: Duration) -> Vec<Delivered<T>> {
        let deadline = Instant::now() + timeout;
        let mut delivered = self.process_completions();

        while delivered.is_empty() && self.has_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.completion_rx.recv_timeout(remaining) {
                Ok(completion) => {
                    delivered.extend(self.deliver(completion));
                    delivered.extend(self.process_completions());
                }
                Err(_) => break,
            }
        }
        delivered
    }

    fn deliver(&mut self, completion: Completion<T>) -> Option<Delivered<T>> {
        let Completion {
            task_id,
            generation,
            result,
        } = completion;

        let live_generation = self.tasks.get(&task_id).map(|live| live.generation);
        let stopped_generation = self.stopped.get(&task_id).map(|s| s.generation);
        let on_complete = if live_generation == Some(generation) {
            let mut live = self.tasks.remove(&task_id)?;
            if let Some(thread) = live.thread.take() {
                // The worker has already queued its result; it is exiting.
                let _ = thread.join();
            }
            live.on_complete.take()
        } else if stopped_generation == Some(generation) {
            let mut stopped = self.stopped.remove(&task_id)?;
            debug!(task = %task_id, generation, "delivering result of cancelled run");
            stopped.on_complete.take()
        } else {
            debug!(task = %task_id, generation, "dropping result of superseded run");
            return None;
        };

        match &result {
            TaskResult::Success(_) => info!(task = %task_id, "task completed"),
            TaskResult::Failure(message) => warn!(task = %task_id, error = %message, "task failed"),
        }

        let result = Arc::new(result);
        self.results.insert(task_id.clone(), Arc::clone(&result));
        if let Some(callback) = on_complete {
            callback(&result);
        }
        Some(Delivered { task_id, result })
    }
}

impl<T> Drop for TaskExecutor<T> {
    fn drop(&mut self) {
        // Signal only; never block the coordinator on teardown.
        for live in self.tasks.values() {
            if let Some(signal) = &live.cancel {
                signal.cancel();
            }
        }
    }
}
