//! Typed entry storage wrapper.

use anyhow::Result;
use chrono::{DateTime, Utc};
use codenote_storage::{EntryInsert, EntryWrite};

use crate::models::Entry;

/// Persistence operations the entry service relies on.
///
/// Every read filters by `now`, so an entry past its expiry is never returned
/// even if the sweep has not removed it yet.
pub trait EntryStore: Send + Sync {
    /// Insert a new entry, claiming its code atomically.
    fn insert(&self, entry: &Entry, now: DateTime<Utc>) -> Result<EntryInsert>;

    fn find_by_code(&self, code: i64, now: DateTime<Utc>) -> Result<Option<Entry>>;

    fn code_in_use(&self, code: i64, now: DateTime<Utc>) -> Result<bool>;

    /// Overwrite an existing entry. A changed code is claimed atomically.
    fn replace(&self, entry: &Entry, now: DateTime<Utc>) -> Result<EntryWrite>;

    fn list(&self, now: DateTime<Utc>) -> Result<Vec<Entry>>;

    fn delete(&self, id: &str) -> Result<bool>;

    /// Remove entries whose expiry has passed, returning how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Typed entry storage wrapper around codenote-storage::EntryStorage.
#[derive(Debug, Clone)]
pub struct EntryStorage {
    inner: codenote_storage::EntryStorage,
}

impl EntryStorage {
    pub fn new(inner: codenote_storage::EntryStorage) -> Self {
        Self { inner }
    }
}

impl EntryStore for EntryStorage {
    fn insert(&self, entry: &Entry, now: DateTime<Utc>) -> Result<EntryInsert> {
        let json_bytes = serde_json::to_vec(entry)?;
        self.inner.create(
            &entry.id,
            entry.code,
            entry.expires_at.timestamp_millis(),
            &json_bytes,
            now.timestamp_millis(),
        )
    }

    fn find_by_code(&self, code: i64, now: DateTime<Utc>) -> Result<Option<Entry>> {
        match self.inner.find_by_code(code, now.timestamp_millis())? {
            Some((_, bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn code_in_use(&self, code: i64, now: DateTime<Utc>) -> Result<bool> {
        self.inner.code_in_use(code, now.timestamp_millis())
    }

    fn replace(&self, entry: &Entry, now: DateTime<Utc>) -> Result<EntryWrite> {
        let json_bytes = serde_json::to_vec(entry)?;
        self.inner
            .update(&entry.id, entry.code, &json_bytes, now.timestamp_millis())
    }

    fn list(&self, now: DateTime<Utc>) -> Result<Vec<Entry>> {
        let rows = self.inner.list(now.timestamp_millis())?;
        let mut entries = Vec::with_capacity(rows.len());
        for (_, bytes) in rows {
            entries.push(serde_json::from_slice(&bytes)?);
        }
        Ok(entries)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inner.purge_expired(now.timestamp_millis())
    }
}
