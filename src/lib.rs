//! Proxy executor
//!
//! Lifecycle-managed dispatch of work onto a threaded, greenthreaded or
//! synchronous executor, selected per driver by name.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod util;

pub use error::{Error, ErrorCode, Result};
pub use executor::{
    Executor, ExecutorFactory, ExecutorKind, ExecutorOption, Ownership, ProxyExecutor,
    ProxyOptions, TaskError, TaskFuture,
};
