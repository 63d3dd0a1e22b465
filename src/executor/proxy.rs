//! Proxy executor
//!
//! One start/submit/stop facade over whichever strategy a driver was
//! configured with. The proxy owns executors it built from a factory and
//! shuts them down on stop; executors handed in by the caller are borrowed
//! and left alone.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::DispatchSettings;
use crate::error::{Error, Result};

use super::{
    task_pair, wait_for_all, Completion, DispatchTracker, Executor, ExecutorFactory, ExecutorKind,
    TaskError, TaskFuture, DEFAULT_KIND,
};

// ─────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────

/// Who is responsible for shutting the underlying executor down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Built by the proxy from its factory; shut down on stop
    Owned,
    /// Supplied by the caller; never shut down by the proxy
    Borrowed,
}

/// Value of the `executor` option
#[derive(Clone)]
pub enum ExecutorOption {
    /// Kind name, resolved through the alias table
    Kind(String),
    /// Pre-built executor, used as-is
    Instance(Arc<dyn Executor>),
}

impl fmt::Debug for ExecutorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorOption::Kind(name) => f.debug_tuple("Kind").field(name).finish(),
            ExecutorOption::Instance(executor) => {
                f.debug_tuple("Instance").field(&executor.name()).finish()
            }
        }
    }
}

/// Options consumed by [`ProxyExecutor::build`]
#[derive(Debug, Clone, Default)]
pub struct ProxyOptions {
    pub executor: Option<ExecutorOption>,
}

impl ProxyOptions {
    /// Select an executor by kind name
    pub fn kind(name: impl Into<String>) -> Self {
        Self {
            executor: Some(ExecutorOption::Kind(name.into())),
        }
    }

    /// Use a caller-owned executor
    pub fn instance(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor: Some(ExecutorOption::Instance(executor)),
        }
    }

    /// Options from the `[dispatch]` configuration section
    pub fn from_settings(settings: &DispatchSettings) -> Self {
        Self::kind(settings.executor.clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Proxy Executor
// ─────────────────────────────────────────────────────────────────

struct Lifecycle {
    started: bool,
    executor: Option<Arc<dyn Executor>>,
}

/// Lifecycle-managed dispatch facade for one driver
pub struct ProxyExecutor {
    driver_name: String,
    factory: ExecutorFactory,
    ownership: Ownership,
    lifecycle: Mutex<Lifecycle>,
    tracker: Arc<DispatchTracker>,
}

impl ProxyExecutor {
    /// Create a proxy from an explicit factory.
    ///
    /// With `executor` present the proxy borrows it and the factory is never
    /// called; otherwise the proxy owns whatever the factory produces.
    pub fn new(
        driver_name: impl Into<String>,
        factory: ExecutorFactory,
        executor: Option<Arc<dyn Executor>>,
    ) -> Self {
        let ownership = if executor.is_some() {
            Ownership::Borrowed
        } else {
            Ownership::Owned
        };
        Self {
            driver_name: driver_name.into(),
            factory,
            ownership,
            lifecycle: Mutex::new(Lifecycle {
                started: false,
                executor,
            }),
            tracker: Arc::new(DispatchTracker::new()),
        }
    }

    /// Resolve options into an unstarted proxy
    pub fn build(driver_name: impl Into<String>, options: ProxyOptions) -> Result<Self> {
        let driver_name = driver_name.into();
        let mut factory = ExecutorFactory::from(DEFAULT_KIND);
        let mut executor = None;

        match options.executor {
            Some(ExecutorOption::Kind(name)) => {
                let kind = ExecutorKind::resolve(&name)?;
                factory = ExecutorFactory::from(kind);
            }
            Some(ExecutorOption::Instance(instance)) => {
                executor = Some(instance);
            }
            None => {}
        }

        debug!(
            driver = %driver_name,
            factory = factory.label(),
            borrowed = executor.is_some(),
            "Proxy executor built"
        );
        Ok(Self::new(driver_name, factory, executor))
    }

    /// Materialize the executor if needed and begin accepting work.
    ///
    /// Calling this while already started does nothing.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.started {
            return Ok(());
        }
        // A stop() still draining leaves its owned executor in place; reuse it.
        if self.ownership == Ownership::Owned && lifecycle.executor.is_none() {
            lifecycle.executor = Some(self.factory.create()?);
        }
        lifecycle.started = true;

        info!(
            driver = %self.driver_name,
            executor = lifecycle.executor.as_ref().map(|e| e.name()).unwrap_or("none"),
            ownership = ?self.ownership,
            "Driver executor started"
        );
        Ok(())
    }

    /// Stop accepting work, wait for dispatched tasks, release owned resources.
    ///
    /// Waits on the tasks tracked when the call begins. Task failures are left
    /// for the holders of their futures to observe.
    pub fn stop(&self) {
        self.lifecycle.lock().started = false;

        let pending = self.tracker.snapshot();
        if !pending.is_empty() {
            debug!(
                driver = %self.driver_name,
                pending = pending.len(),
                "Waiting for dispatched tasks"
            );
            wait_for_all(&pending);
        }

        if self.ownership == Ownership::Owned {
            let executor = {
                let mut lifecycle = self.lifecycle.lock();
                // A concurrent start() during the wait keeps its executor.
                if lifecycle.started {
                    None
                } else {
                    lifecycle.executor.take()
                }
            };
            if let Some(executor) = executor {
                executor.shutdown();
            }
        }

        info!(
            driver = %self.driver_name,
            completed = self.tracker.total_completed(),
            failed = self.tracker.total_failed(),
            "Driver executor stopped"
        );
    }

    /// Dispatch a closure to the executor and track it until it finishes
    pub fn submit<F, T>(&self, f: F) -> Result<TaskFuture<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let executor = {
            let lifecycle = self.lifecycle.lock();
            match (lifecycle.started, lifecycle.executor.as_ref()) {
                (true, Some(executor)) => executor.clone(),
                _ => return Err(Error::not_started(&self.driver_name)),
            }
        };

        let (future, job) = task_pair(f);
        let erased: Arc<dyn Completion> = Arc::new(future.clone());
        let id = self.tracker.track(erased);

        let tracker: Weak<DispatchTracker> = Arc::downgrade(&self.tracker);
        future.add_done_callback(move |done| {
            if let Some(tracker) = tracker.upgrade() {
                tracker.finish(id, done.is_failed());
            }
        });

        if let Err(rejected) = executor.execute(job) {
            // The job was dropped unrun. Settle its future so a stop() that
            // already snapshotted it does not wait forever.
            self.tracker.discard(id);
            future.complete(Err(TaskError::Rejected));
            return Err(Error::executor_shutdown(&self.driver_name, rejected));
        }
        Ok(future)
    }

    /// Driver name used in diagnostics
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Ownership of the underlying executor
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether the proxy currently accepts submissions
    pub fn is_started(&self) -> bool {
        self.lifecycle.lock().started
    }

    /// Whether an executor instance is currently held
    pub fn has_executor(&self) -> bool {
        self.lifecycle.lock().executor.is_some()
    }

    /// Number of dispatched tasks not yet observed complete
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    /// Dispatch bookkeeping
    pub fn tracker(&self) -> Arc<DispatchTracker> {
        self.tracker.clone()
    }
}

impl fmt::Debug for ProxyExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyExecutor")
            .field("driver_name", &self.driver_name)
            .field("factory", &self.factory)
            .field("ownership", &self.ownership)
            .field("started", &self.is_started())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SynchronousExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sync_factory() -> (ExecutorFactory, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = ExecutorFactory::new("counting", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let executor: Arc<dyn Executor> = Arc::new(SynchronousExecutor::new());
            Ok(executor)
        });
        (factory, calls)
    }

    #[test]
    fn test_build_defaults_to_owned_threaded() {
        let proxy = ProxyExecutor::build("memcached", ProxyOptions::default()).unwrap();
        assert_eq!(proxy.ownership(), Ownership::Owned);
        assert!(!proxy.is_started());
        assert!(!proxy.has_executor());
        assert_eq!(proxy.factory.label(), "threaded");
    }

    #[test]
    fn test_build_resolves_alias() {
        let proxy = ProxyExecutor::build("file", ProxyOptions::kind("greenthread")).unwrap();
        assert_eq!(proxy.factory.label(), "greenthreaded");
        assert_eq!(proxy.ownership(), Ownership::Owned);
    }

    #[test]
    fn test_build_with_instance_is_borrowed() {
        let executor: Arc<dyn Executor> = Arc::new(SynchronousExecutor::new());
        let proxy = ProxyExecutor::build("ipc", ProxyOptions::instance(executor)).unwrap();
        assert_eq!(proxy.ownership(), Ownership::Borrowed);
        assert!(proxy.has_executor());
    }

    #[test]
    fn test_submit_requires_start() {
        let proxy = ProxyExecutor::build("redis", ProxyOptions::kind("sync")).unwrap();
        let err = proxy.submit(|| 1).unwrap_err();
        assert!(matches!(err, Error::NotStarted { .. }));
        assert_eq!(proxy.in_flight(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (factory, calls) = counting_sync_factory();
        let proxy = ProxyExecutor::new("pgsql", factory, None);
        proxy.start().unwrap();
        proxy.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_rematerializes_owned_executor() {
        let (factory, calls) = counting_sync_factory();
        let proxy = ProxyExecutor::new("mysql", factory, None);

        proxy.start().unwrap();
        proxy.stop();
        assert!(!proxy.has_executor());

        proxy.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(proxy.submit(|| "ok").unwrap().result(), Ok("ok"));
    }

    #[test]
    fn test_completed_tasks_leave_dispatched_set() {
        let proxy = ProxyExecutor::build("consul", ProxyOptions::kind("sync")).unwrap();
        proxy.start().unwrap();

        let fut = proxy.submit(|| 2 + 2).unwrap();
        assert!(fut.is_done());
        assert_eq!(proxy.in_flight(), 0);
        assert_eq!(proxy.tracker().total_completed(), 1);
        proxy.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let proxy = ProxyExecutor::build("etcd3", ProxyOptions::kind("threading")).unwrap();
        proxy.stop();
        proxy.start().unwrap();
        proxy.stop();
        proxy.stop();
        assert!(!proxy.is_started());
        assert!(!proxy.has_executor());
    }
}
