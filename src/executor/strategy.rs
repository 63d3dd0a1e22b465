//! Execution strategies
//!
//! The [`Executor`] capability and the three strategies the proxy can
//! materialize by kind:
//! - [`ThreadedExecutor`]: one dedicated worker thread, FIFO queue
//! - [`GreenThreadedExecutor`]: one thread driving a cooperative
//!   single-threaded tokio runtime
//! - [`SynchronousExecutor`]: inline on the caller's thread
//!
//! Every strategy bounds execution to one worker so a driver never runs more
//! than one task at a time; extra submissions queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{TaskError, TaskFuture};

/// Unit of work accepted by an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Rejection returned by an executor that has been shut down
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot schedule new jobs after shutdown")]
pub struct ExecutorShutdown;

// ─────────────────────────────────────────────────────────────────
// Executor Capability
// ─────────────────────────────────────────────────────────────────

/// Anything that accepts jobs and can be shut down
pub trait Executor: Send + Sync {
    /// Short strategy name for diagnostics
    fn name(&self) -> &str;

    /// Queue or run a job
    fn execute(&self, job: Job) -> std::result::Result<(), ExecutorShutdown>;

    /// Stop accepting jobs, let queued jobs finish and release the worker
    fn shutdown(&self);

    /// Whether `shutdown` has been called
    fn is_shutdown(&self) -> bool;
}

/// Pair a closure with the future it will fulfil.
///
/// The returned job catches panics so a failing task completes its future
/// instead of tearing down the worker.
pub fn task_pair<F, T>(f: F) -> (TaskFuture<T>, Job)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let future = TaskFuture::pending();
    let completer = future.clone();
    let job: Job = Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskError::from_panic);
        completer.complete(result);
    });
    (future, job)
}

/// Submit a closure directly to an executor, without tracking
pub fn submit<F, T>(
    executor: &dyn Executor,
    f: F,
) -> std::result::Result<TaskFuture<T>, ExecutorShutdown>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (future, job) = task_pair(f);
    executor.execute(job)?;
    Ok(future)
}

fn join_worker(name: &str, worker: Option<JoinHandle<()>>) {
    let Some(handle) = worker else {
        return;
    };
    // Shutting down from inside a job must not join the thread running it.
    if handle.thread().id() == thread::current().id() {
        debug!(executor = name, "Shutdown requested from worker thread, detaching");
        return;
    }
    if handle.join().is_err() {
        warn!(executor = name, "Executor worker thread panicked");
    }
}

// ─────────────────────────────────────────────────────────────────
// Threaded
// ─────────────────────────────────────────────────────────────────

/// Single worker thread draining an unbounded FIFO queue
pub struct ThreadedExecutor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedExecutor {
    /// Spawn the worker thread
    pub fn new() -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let worker = thread::Builder::new()
            .name("proxy-executor-thread".to_string())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    job();
                }
            })
            .map_err(|e| Error::Internal(format!("Failed to spawn executor thread: {}", e)))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl Executor for ThreadedExecutor {
    fn name(&self) -> &str {
        "threaded"
    }

    fn execute(&self, job: Job) -> std::result::Result<(), ExecutorShutdown> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).map_err(|_| ExecutorShutdown),
            None => Err(ExecutorShutdown),
        }
    }

    fn shutdown(&self) {
        // Dropping the sender closes the queue; the worker exits once drained.
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        join_worker(self.name(), worker);
    }

    fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }
}

// ─────────────────────────────────────────────────────────────────
// Green-threaded
// ─────────────────────────────────────────────────────────────────

/// Cooperative executor: one thread driving a current-thread tokio runtime.
///
/// Each job becomes a task on that runtime, so jobs interleave only at
/// their own yield points and never run in parallel.
pub struct GreenThreadedExecutor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl GreenThreadedExecutor {
    /// Build the runtime and spawn the thread that drives it
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create cooperative runtime: {}", e)))?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let worker = thread::Builder::new()
            .name("proxy-executor-green".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut tasks = JoinSet::new();
                    while let Some(job) = receiver.recv().await {
                        tasks.spawn(async move { job() });
                        // Reap finished tasks so the set does not grow unbounded.
                        while tasks.try_join_next().is_some() {}
                    }
                    while tasks.join_next().await.is_some() {}
                });
            })
            .map_err(|e| Error::Internal(format!("Failed to spawn executor thread: {}", e)))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl Executor for GreenThreadedExecutor {
    fn name(&self) -> &str {
        "greenthreaded"
    }

    fn execute(&self, job: Job) -> std::result::Result<(), ExecutorShutdown> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).map_err(|_| ExecutorShutdown),
            None => Err(ExecutorShutdown),
        }
    }

    fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        join_worker(self.name(), worker);
    }

    fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }
}

// ─────────────────────────────────────────────────────────────────
// Synchronous
// ─────────────────────────────────────────────────────────────────

/// Runs every job to completion inside `execute`
#[derive(Debug, Default)]
pub struct SynchronousExecutor {
    shutdown: AtomicBool,
}

impl SynchronousExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for SynchronousExecutor {
    fn name(&self) -> &str {
        "synchronous"
    }

    fn execute(&self, job: Job) -> std::result::Result<(), ExecutorShutdown> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ExecutorShutdown);
        }
        job();
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn record_order(executor: &dyn Executor) -> Vec<usize> {
        let order = Arc::new(Mutex::new(Vec::new()));
        let futures: Vec<_> = (0..5)
            .map(|i| {
                let order = order.clone();
                submit(executor, move || {
                    thread::sleep(Duration::from_millis(2));
                    order.lock().push(i);
                })
                .unwrap()
            })
            .collect();
        for fut in &futures {
            fut.wait();
        }
        let recorded = order.lock().clone();
        recorded
    }

    #[test]
    fn test_threaded_runs_in_submission_order() {
        let executor = ThreadedExecutor::new().unwrap();
        assert_eq!(record_order(&executor), vec![0, 1, 2, 3, 4]);
        executor.shutdown();
    }

    #[test]
    fn test_threaded_runs_off_caller_thread() {
        let executor = ThreadedExecutor::new().unwrap();
        let caller = thread::current().id();
        let fut = submit(&executor, move || thread::current().id() != caller).unwrap();
        assert_eq!(fut.result(), Ok(true));
        executor.shutdown();
    }

    #[test]
    fn test_threaded_shutdown_drains_queue_then_rejects() {
        let executor = ThreadedExecutor::new().unwrap();
        let futures: Vec<_> = (0..3)
            .map(|i| {
                submit(&executor, move || {
                    thread::sleep(Duration::from_millis(10));
                    i
                })
                .unwrap()
            })
            .collect();

        executor.shutdown();
        assert!(executor.is_shutdown());
        assert!(futures.iter().all(|f| f.is_done()));
        assert!(matches!(submit(&executor, || ()), Err(ExecutorShutdown)));
    }

    #[test]
    fn test_green_threaded_runs_jobs() {
        let executor = GreenThreadedExecutor::new().unwrap();
        let mut order = record_order(&executor);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);

        executor.shutdown();
        assert!(executor.is_shutdown());
        assert_eq!(submit(&executor, || ()).unwrap_err(), ExecutorShutdown);
    }

    #[test]
    fn test_synchronous_completes_before_returning() {
        let executor = SynchronousExecutor::new();
        let caller = thread::current().id();
        let fut = submit(&executor, move || thread::current().id() == caller).unwrap();
        assert!(fut.is_done());
        assert_eq!(fut.result(), Ok(true));

        executor.shutdown();
        assert!(submit(&executor, || ()).is_err());
    }

    #[test]
    fn test_panicking_job_fails_future_but_not_worker() {
        let executor = ThreadedExecutor::new().unwrap();
        let bad = submit(&executor, || -> u8 { panic!("kaboom") }).unwrap();
        let good = submit(&executor, || 5u8).unwrap();

        bad.wait();
        assert_eq!(bad.error(), Some(TaskError::Panicked("kaboom".into())));
        assert_eq!(good.result(), Ok(5));
        executor.shutdown();
    }

    #[test]
    fn test_shutdown_from_inside_job_does_not_deadlock() {
        let executor = Arc::new(ThreadedExecutor::new().unwrap());
        let inner = executor.clone();
        let fut = submit(executor.as_ref(), move || inner.shutdown()).unwrap();
        fut.wait();
        assert!(executor.is_shutdown());
    }
}
