//! Export results of a simulation.
//!
//! Results are written by a [StorageManager] which forwards every element to all storage
//! solutions selected in the [StorageBuilder].
//! File based solutions lay out results as
//! `<location>/<date>/<suffix>/<format>/<iteration>/batch_<instance>.<extension>`.

mod concepts;
/// Json and ron files.
mod file_formats;
/// Keep results in memory.
mod memory_storage;

pub use self::file_formats::*;
pub use self::memory_storage::*;
pub use concepts::*;
