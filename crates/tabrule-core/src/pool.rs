//! Bounded worker pool for apply requests.
//!
//! Tasks for different files run concurrently on up to `workers` threads.
//! Tasks for the same file run one at a time in submission order: while a
//! file has a task in flight, later tasks for it wait in a per-file queue
//! and are picked up by the worker that finishes the previous one.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tabrule_model::{Caller, EngineError, ExecutionResult, Result};
use tracing::{debug, warn};

use crate::executor::{RuleExecutor, RuleSelection};

struct Task {
    file_id: String,
    selection: RuleSelection,
    caller: Caller,
    progress: Arc<AtomicU8>,
    reply: Sender<Result<ExecutionResult>>,
}

/// File ids with a task in flight, and the tasks queued behind them.
type Pending = Arc<Mutex<HashMap<String, VecDeque<Task>>>>;

/// Handle to a submitted apply request.
#[derive(Debug)]
pub struct TaskHandle {
    file_id: String,
    progress: Arc<AtomicU8>,
    result: Receiver<Result<ExecutionResult>>,
}

impl TaskHandle {
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Completion percentage, 0 to 100. Never decreases.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// Block until the task finishes. Only the first call receives the
    /// result.
    pub fn wait(&self) -> Result<ExecutionResult> {
        self.result.recv().unwrap_or_else(|_| Err(self.worker_lost()))
    }

    /// Wait up to `timeout`; `None` if the task is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<ExecutionResult>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(self.worker_lost())),
        }
    }

    /// Result if the task already finished.
    pub fn try_wait(&self) -> Option<Result<ExecutionResult>> {
        self.result.try_recv().ok()
    }

    fn worker_lost(&self) -> EngineError {
        EngineError::Storage(format!(
            "worker stopped before finishing task for '{}'",
            self.file_id
        ))
    }
}

pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    pending: Pending,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` threads (at least one) sharing a queue of
    /// `queue_capacity` tasks.
    pub fn new(executor: Arc<RuleExecutor>, workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = bounded::<Task>(queue_capacity.max(1));
        let pending: Pending = Arc::default();
        let workers = (0..workers.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                let executor = Arc::clone(&executor);
                let pending = Arc::clone(&pending);
                std::thread::spawn(move || worker_loop(index, &receiver, &executor, &pending))
            })
            .collect();
        Self {
            sender: Some(sender),
            pending,
            workers,
        }
    }

    /// Queue an apply request. Blocks while the shared queue is full.
    pub fn submit(
        &self,
        file_id: impl Into<String>,
        selection: RuleSelection,
        caller: Caller,
    ) -> Result<TaskHandle> {
        let file_id = file_id.into();
        let (reply, result) = bounded(1);
        let progress = Arc::new(AtomicU8::new(0));
        let task = Task {
            file_id: file_id.clone(),
            selection,
            caller,
            progress: Arc::clone(&progress),
            reply,
        };
        let handle = TaskHandle {
            file_id: file_id.clone(),
            progress,
            result,
        };

        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(queue) = pending.get_mut(&file_id) {
                debug!(file_id, queued = queue.len() + 1, "file busy, queued task");
                queue.push_back(task);
                return Ok(handle);
            }
            pending.insert(file_id.clone(), VecDeque::new());
        }

        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| EngineError::Storage("worker pool is shut down".to_string()))?;
        if sender.send(task).is_err() {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&file_id);
            return Err(EngineError::Storage("worker pool is shut down".to_string()));
        }
        Ok(handle)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Finish queued work and join the workers.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(index: usize, receiver: &Receiver<Task>, executor: &RuleExecutor, pending: &Pending) {
    debug!(worker = index, "worker started");
    while let Ok(task) = receiver.recv() {
        let mut next = Some(task);
        while let Some(task) = next {
            let file_id = task.file_id.clone();
            run_task(executor, task);
            // Hand the file's next queued task to this worker, or release it.
            let mut map = pending.lock().unwrap_or_else(PoisonError::into_inner);
            next = match map.get_mut(&file_id).and_then(VecDeque::pop_front) {
                Some(task) => Some(task),
                None => {
                    map.remove(&file_id);
                    None
                }
            };
        }
    }
    debug!(worker = index, "worker stopped");
}

fn run_task(executor: &RuleExecutor, task: Task) {
    let progress = Arc::clone(&task.progress);
    let report = move |percent: u8| {
        progress.fetch_max(percent.min(100), Ordering::AcqRel);
    };
    let result = executor.execute(&task.file_id, &task.selection, &task.caller, &report);
    if result.is_ok() {
        task.progress.store(100, Ordering::Release);
    }
    // The submitter may have dropped its handle.
    let _ = task.reply.send(result);
}
