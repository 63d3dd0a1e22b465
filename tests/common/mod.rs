//! Common test utilities and fixtures
//!
//! Provides a controllable executor and a counting factory shared by the
//! integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use proxy_executor::executor::{Executor, ExecutorShutdown, Job, SynchronousExecutor};
use proxy_executor::ExecutorFactory;

/// One-shot latch that tasks can block on until the test releases them
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        let (open, cvar) = &*self.inner;
        *open.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn wait(&self) {
        let (open, cvar) = &*self.inner;
        let mut guard = open.lock().unwrap();
        while !*guard {
            guard = cvar.wait(guard).unwrap();
        }
    }

    pub fn is_open(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }
}

/// Executor that runs each job on its own thread and counts shutdowns
#[derive(Default)]
pub struct FakeExecutor {
    shutdown: AtomicBool,
    shutdown_calls: AtomicUsize,
    executed: AtomicUsize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl Executor for FakeExecutor {
    fn name(&self) -> &str {
        "fake"
    }

    fn execute(&self, job: Job) -> Result<(), ExecutorShutdown> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(ExecutorShutdown);
        }
        self.executed.fetch_add(1, Ordering::SeqCst);
        let handle = thread::spawn(job);
        self.workers.lock().unwrap().push(handle);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        let workers: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for worker in workers {
            let _ = worker.join();
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Executor that parks inside `execute` until released, then refuses the job
#[derive(Default)]
pub struct StallingRejector {
    pub entered: Gate,
    pub release: Gate,
}

impl StallingRejector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Executor for StallingRejector {
    fn name(&self) -> &str {
        "stalling-rejector"
    }

    fn execute(&self, _job: Job) -> Result<(), ExecutorShutdown> {
        self.entered.release();
        self.release.wait();
        Err(ExecutorShutdown)
    }

    fn shutdown(&self) {}

    fn is_shutdown(&self) -> bool {
        true
    }
}

/// Factory that hands out fresh `FakeExecutor`s and remembers each one
pub struct CountingFactory {
    pub factory: ExecutorFactory,
    created: Arc<Mutex<Vec<Arc<FakeExecutor>>>>,
}

impl CountingFactory {
    pub fn calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Executor produced by the `index`th factory call
    pub fn created(&self, index: usize) -> Arc<FakeExecutor> {
        self.created.lock().unwrap()[index].clone()
    }
}

pub fn counting_factory() -> CountingFactory {
    let created: Arc<Mutex<Vec<Arc<FakeExecutor>>>> = Arc::default();
    let registry = created.clone();
    let factory = ExecutorFactory::new("fake", move || {
        let executor = FakeExecutor::new();
        registry.lock().unwrap().push(executor.clone());
        let erased: Arc<dyn Executor> = executor;
        Ok(erased)
    });
    CountingFactory { factory, created }
}

/// Factory producing synchronous executors
pub fn sync_factory() -> ExecutorFactory {
    ExecutorFactory::new("sync", || {
        let executor: Arc<dyn Executor> = Arc::new(SynchronousExecutor::new());
        Ok(executor)
    })
}

/// Poll `condition` until it holds or `timeout` passes
pub fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
