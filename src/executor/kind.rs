//! Executor kinds and factories
//!
//! Maps configuration names onto the strategies in [`super::strategy`].
//! Names are resolved once when a proxy is built, never per call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::{Executor, GreenThreadedExecutor, SynchronousExecutor, ThreadedExecutor};

// ─────────────────────────────────────────────────────────────────
// Executor Kind
// ─────────────────────────────────────────────────────────────────

/// Supported executor strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    /// One dedicated worker thread
    Threaded,
    /// One cooperative lightweight-thread worker
    GreenThreaded,
    /// Inline on the submitting thread
    Synchronous,
}

/// Every accepted name, canonical kinds and their aliases
pub const KIND_ALIASES: &[(&str, ExecutorKind)] = &[
    ("threaded", ExecutorKind::Threaded),
    ("thread", ExecutorKind::Threaded),
    ("threading", ExecutorKind::Threaded),
    ("greenthreaded", ExecutorKind::GreenThreaded),
    ("greenthread", ExecutorKind::GreenThreaded),
    ("greenthreading", ExecutorKind::GreenThreaded),
    ("synchronous", ExecutorKind::Synchronous),
    ("sync", ExecutorKind::Synchronous),
];

/// Kind used when no executor option is given
pub const DEFAULT_KIND: ExecutorKind = ExecutorKind::Threaded;

impl ExecutorKind {
    /// Get all executor kinds
    pub fn all() -> &'static [ExecutorKind] {
        &[
            ExecutorKind::Threaded,
            ExecutorKind::GreenThreaded,
            ExecutorKind::Synchronous,
        ]
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            ExecutorKind::Threaded => "threaded",
            ExecutorKind::GreenThreaded => "greenthreaded",
            ExecutorKind::Synchronous => "synchronous",
        }
    }

    /// Exact, case-sensitive lookup in the alias table
    pub fn from_name(name: &str) -> Option<Self> {
        KIND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, kind)| *kind)
    }

    /// All accepted names, sorted
    pub fn accepted_names() -> Vec<&'static str> {
        let mut names: Vec<_> = KIND_ALIASES.iter().map(|(alias, _)| *alias).collect();
        names.sort_unstable();
        names
    }

    /// Like [`from_name`](Self::from_name), failing with the accepted names on a miss
    pub fn resolve(name: &str) -> Result<Self> {
        Self::from_name(name).ok_or_else(|| Error::UnknownExecutorKind {
            kind: name.to_string(),
            accepted: Self::accepted_names(),
        })
    }

    /// Materialize a fresh executor of this kind
    pub fn create(&self) -> Result<Arc<dyn Executor>> {
        let executor: Arc<dyn Executor> = match self {
            ExecutorKind::Threaded => Arc::new(ThreadedExecutor::new()?),
            ExecutorKind::GreenThreaded => Arc::new(GreenThreadedExecutor::new()?),
            ExecutorKind::Synchronous => Arc::new(SynchronousExecutor::new()),
        };
        Ok(executor)
    }
}

impl Default for ExecutorKind {
    fn default() -> Self {
        DEFAULT_KIND
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExecutorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::resolve(s)
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor Factory
// ─────────────────────────────────────────────────────────────────

type FactoryFn = dyn Fn() -> Result<Arc<dyn Executor>> + Send + Sync;

/// Zero-argument producer of executors
#[derive(Clone)]
pub struct ExecutorFactory {
    label: String,
    make: Arc<FactoryFn>,
}

impl ExecutorFactory {
    /// Wrap a custom constructor
    pub fn new<F>(label: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Executor>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            make: Arc::new(make),
        }
    }

    /// Label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Produce a new executor
    pub fn create(&self) -> Result<Arc<dyn Executor>> {
        (self.make)()
    }
}

impl From<ExecutorKind> for ExecutorFactory {
    fn from(kind: ExecutorKind) -> Self {
        Self::new(kind.name(), move || kind.create())
    }
}

impl fmt::Debug for ExecutorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorFactory")
            .field("label", &self.label)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
