//! Storage layer with typed wrappers around codenote-storage.
//!
//! This module converts between the entry model and the byte-level APIs of
//! codenote-storage, and defines the `EntryStore` seam the service depends on.

pub mod entry;

use anyhow::Result;
use std::path::Path;

pub use codenote_storage::{EntryInsert, EntryWrite};
pub use entry::{EntryStorage, EntryStore};

/// Central storage manager.
///
/// Opened once at process start; the database closes when the last handle drops.
pub struct Storage {
    pub entries: EntryStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let inner = codenote_storage::Storage::new(path)?;
        let entries = EntryStorage::new(inner.entries);

        Ok(Self { entries })
    }
}
