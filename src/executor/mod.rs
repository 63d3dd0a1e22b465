//! Task dispatch module
//!
//! Handles the dispatch lifecycle for a driver:
//! - Resolving an executor kind from configuration
//! - Materializing or borrowing the executor
//! - Tracking in-flight futures
//! - Draining them on stop

mod future;
mod kind;
mod proxy;
mod state;
mod strategy;

pub use future::*;
pub use kind::*;
pub use proxy::*;
pub use state::*;
pub use strategy::*;
