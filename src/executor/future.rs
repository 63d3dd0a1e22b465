//! Task completion handles
//!
//! A [`TaskFuture`] is the caller-side view of one submitted job. The worker
//! side fulfils it exactly once; callers can block on it, poll it or attach
//! completion callbacks that run on whichever thread fulfils it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Failure observed through a [`TaskFuture`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task panicked while running
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The executor refused the task, so it never ran
    #[error("task was rejected by a shut down executor")]
    Rejected,

    /// The result was already moved out by another handle
    #[error("task result was already taken")]
    Consumed,
}

impl TaskError {
    /// Build a panic error from an unwind payload
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

type DoneCallback<T> = Box<dyn FnOnce(&TaskFuture<T>) + Send + 'static>;

enum Outcome<T> {
    Pending,
    Ready(Result<T, TaskError>),
    Taken,
}

struct FutureState<T> {
    outcome: Outcome<T>,
    callbacks: Vec<DoneCallback<T>>,
}

struct Shared<T> {
    state: Mutex<FutureState<T>>,
    done: Condvar,
}

/// Handle to a pending or completed task result
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("done", &self.is_done())
            .finish()
    }
}

impl<T: Send + 'static> TaskFuture<T> {
    /// Create an unfulfilled future
    pub(crate) fn pending() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FutureState {
                    outcome: Outcome::Pending,
                    callbacks: Vec::new(),
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// Fulfil the future, wake waiters and run callbacks on this thread.
    ///
    /// Only the first call has any effect.
    pub(crate) fn complete(&self, result: Result<T, TaskError>) {
        let callbacks = {
            let mut state = self.shared.state.lock();
            if !matches!(state.outcome, Outcome::Pending) {
                return;
            }
            state.outcome = Outcome::Ready(result);
            std::mem::take(&mut state.callbacks)
        };
        self.shared.done.notify_all();

        for callback in callbacks {
            callback(self);
        }
    }

    /// Register a callback to run once the task finishes.
    ///
    /// Runs immediately on the calling thread if the task is already done.
    pub fn add_done_callback<F>(&self, callback: F)
    where
        F: FnOnce(&TaskFuture<T>) + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if matches!(state.outcome, Outcome::Pending) {
                state.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback(self);
    }

    /// Whether the task has finished, successfully or not
    pub fn is_done(&self) -> bool {
        !matches!(self.shared.state.lock().outcome, Outcome::Pending)
    }

    /// Whether the task finished with an error
    pub fn is_failed(&self) -> bool {
        matches!(self.shared.state.lock().outcome, Outcome::Ready(Err(_)))
    }

    /// Block the calling thread until the task finishes
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while matches!(state.outcome, Outcome::Pending) {
            self.shared.done.wait(&mut state);
        }
    }

    /// The task error, if it finished with one. Does not block.
    pub fn error(&self) -> Option<TaskError> {
        match &self.shared.state.lock().outcome {
            Outcome::Ready(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Wait for the task and move its result out of the shared slot
    pub fn join(self) -> Result<T, TaskError> {
        self.wait();
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut state.outcome, Outcome::Taken) {
            Outcome::Ready(result) => result,
            Outcome::Taken => Err(TaskError::Consumed),
            Outcome::Pending => unreachable!("wait() returned while pending"),
        }
    }
}

impl<T: Clone + Send + 'static> TaskFuture<T> {
    /// Wait for the task and clone its result
    pub fn result(&self) -> Result<T, TaskError> {
        self.wait();
        match &self.shared.state.lock().outcome {
            Outcome::Ready(result) => result.clone(),
            Outcome::Taken => Err(TaskError::Consumed),
            Outcome::Pending => unreachable!("wait() returned while pending"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Type-erased completion
// ─────────────────────────────────────────────────────────────────

/// Completion view of a future whose result type has been erased.
///
/// Lets heterogeneous futures share one dispatched set.
pub trait Completion: Send + Sync {
    /// Whether the task has finished
    fn is_done(&self) -> bool;

    /// Block until the task has finished
    fn wait(&self);
}

impl<T: Send + 'static> Completion for TaskFuture<T> {
    fn is_done(&self) -> bool {
        TaskFuture::is_done(self)
    }

    fn wait(&self) {
        TaskFuture::wait(self)
    }
}

/// Block until every handle reports completion
pub fn wait_for_all(handles: &[Arc<dyn Completion>]) {
    for handle in handles {
        handle.wait();
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
