//! Serialization of fitted parameters.
//!
//! Fitted components expose their state as plain parameter structs
//! (`Vec<f64>`, scalars, nested structs). Those structs go to bytes through
//! [`SerializableParams`], and bytes go to disk through [`write_atomic`] so a
//! failed save never leaves a half-written artifact behind.

use crate::error::{Result, StressError};
use std::io::Write;
use std::path::Path;

/// A parameter representation that can be serialized to and from bytes.
///
/// Implemented for every serde type via bincode. Floats are stored with their
/// exact bit patterns, so a round trip is lossless.
pub trait SerializableParams: Sized {
    fn to_bytes(&self) -> Result<Vec<u8>>;

    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Write `bytes` to `path` via a temporary file in the same directory.
///
/// The file appears under its final name only once it is complete.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| StressError::persistence(path, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| StressError::persistence(path, e))?;
    tmp.persist(path)
        .map_err(|e| StressError::persistence(path, e.error))?;
    Ok(())
}

/// Read a whole artifact into memory.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| StressError::persistence(path, e))
}

/// Save any serializable parameter struct to `path`.
pub fn save_params<T: SerializableParams>(params: &T, path: &Path) -> Result<()> {
    let bytes = params
        .to_bytes()
        .map_err(|e| StressError::persistence(path, e))?;
    write_atomic(path, &bytes)
}

/// Load a parameter struct previously written by [`save_params`].
pub fn load_params<T: SerializableParams>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    T::from_bytes(&bytes).map_err(|e| StressError::persistence(path, e))
}
