//! Codenote Storage - Low-level storage layer
//!
//! This crate provides the persistence layer for Codenote, using redb as the
//! embedded database. It exposes byte-level APIs so the entry model stays in
//! codenote-core.
//!
//! # Tables
//!
//! - `entries` - Entry records (JSON)
//! - `entry_code_index` / `entry_codes` - Code lookup, both directions
//! - `entry_expiry` / `entry_expiry_index` - Expiry time per entry, time-ordered

pub mod entry;
pub mod range_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use entry::{EntryInsert, EntryStorage, EntryWrite};

/// Central storage manager that opens the database and initializes all tables
pub struct Storage {
    pub entries: EntryStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let entries = EntryStorage::new(db)?;

        Ok(Self { entries })
    }
}
