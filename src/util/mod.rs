//! Helpers shared by drivers
//!
//! - Path sandboxing under a root directory
//! - Collapsing list-valued configuration tables
//! - MessagePack encoding with normalized errors

mod codec;
mod collapse;
mod paths;

pub use codec::{dumps, loads};
pub use collapse::{collapse, ItemSelector};
pub use paths::{ensure_tree, safe_abs_path};
