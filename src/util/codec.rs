//! MessagePack encoding
//!
//! Thin wrappers over `rmp-serde` that normalize every encode or decode
//! failure into [`Error::Serialization`], keeping the original as the cause.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Serialize a value into MessagePack bytes
pub fn dumps<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    rmp_serde::to_vec_named(value).map_err(Error::serialization)
}

/// Deserialize a value from MessagePack bytes
pub fn loads<T>(blob: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    rmp_serde::from_slice(blob).map_err(Error::serialization)
}
