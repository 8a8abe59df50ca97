//! Entry storage with a code index and a time-ordered expiry index.
//!
//! Code claims happen inside the same write transaction as the record write,
//! so two writers can never both take the same live code.

use anyhow::{Result, anyhow};
use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use std::sync::Arc;
use tracing::debug;

use crate::range_utils::{expiry_key, expiry_upper_bound};

/// Entries table: id -> JSON entry
const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
/// Index: code -> id
const CODE_INDEX_TABLE: TableDefinition<i64, &str> = TableDefinition::new("entry_code_index");
/// Reverse index: id -> code
const ENTRY_CODES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("entry_codes");
/// id -> expires_at (ms)
const EXPIRY_TABLE: TableDefinition<&str, i64> = TableDefinition::new("entry_expiry");
/// "{expires_at:020}:{id}" -> id
const EXPIRY_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("entry_expiry_index");

/// Result of inserting a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryInsert {
    Inserted,
    CodeInUse(i64),
}

/// Result of rewriting an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryWrite {
    Applied,
    CodeInUse(i64),
    NotFound,
}

/// Low-level entry storage
#[derive(Debug, Clone)]
pub struct EntryStorage {
    db: Arc<Database>,
}

impl EntryStorage {
    /// Create a new EntryStorage, initializing all tables.
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(ENTRIES_TABLE)?;
        write_txn.open_table(CODE_INDEX_TABLE)?;
        write_txn.open_table(ENTRY_CODES_TABLE)?;
        write_txn.open_table(EXPIRY_TABLE)?;
        write_txn.open_table(EXPIRY_INDEX_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new entry, claiming `code` if given.
    ///
    /// Returns `EntryInsert::CodeInUse` without writing anything when a live entry holds the code.
    pub fn create(
        &self,
        id: &str,
        code: Option<i64>,
        expires_at_ms: i64,
        data: &[u8],
        now_ms: i64,
    ) -> Result<EntryInsert> {
        let write_txn = self.db.begin_write()?;

        if let Some(code) = code
            && !Self::claim_code(&write_txn, code, id, now_ms)?
        {
            write_txn.abort()?;
            return Ok(EntryInsert::CodeInUse(code));
        }

        {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            if entries.get(id)?.is_some() {
                return Err(anyhow!("Entry {} already exists", id));
            }
            entries.insert(id, data)?;
        }

        {
            let mut expiry = write_txn.open_table(EXPIRY_TABLE)?;
            expiry.insert(id, expires_at_ms)?;
            let mut expiry_index = write_txn.open_table(EXPIRY_INDEX_TABLE)?;
            let key = expiry_key(expires_at_ms, id);
            expiry_index.insert(key.as_str(), id)?;
        }

        write_txn.commit()?;
        Ok(EntryInsert::Inserted)
    }

    /// Get a live entry by id.
    pub fn get(&self, id: &str, now_ms: i64) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        let expiry = read_txn.open_table(EXPIRY_TABLE)?;

        if !Self::is_live(&expiry, id, now_ms)? {
            return Ok(None);
        }
        Ok(entries.get(id)?.map(|value| value.value().to_vec()))
    }

    /// Look up the live entry holding `code`, returning (id, data).
    pub fn find_by_code(&self, code: i64, now_ms: i64) -> Result<Option<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CODE_INDEX_TABLE)?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        let expiry = read_txn.open_table(EXPIRY_TABLE)?;

        let Some(id) = index.get(code)?.map(|value| value.value().to_string()) else {
            return Ok(None);
        };
        if !Self::is_live(&expiry, &id, now_ms)? {
            return Ok(None);
        }
        Ok(entries
            .get(id.as_str())?
            .map(|value| (id.clone(), value.value().to_vec())))
    }

    /// Check whether a live entry holds `code`.
    pub fn code_in_use(&self, code: i64, now_ms: i64) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CODE_INDEX_TABLE)?;
        let expiry = read_txn.open_table(EXPIRY_TABLE)?;

        match index.get(code)? {
            Some(id) => Self::is_live(&expiry, id.value(), now_ms),
            None => Ok(false),
        }
    }

    /// Replace a live entry's data, moving it to `new_code` when that differs
    /// from its current code.
    pub fn update(
        &self,
        id: &str,
        new_code: Option<i64>,
        data: &[u8],
        now_ms: i64,
    ) -> Result<EntryWrite> {
        let write_txn = self.db.begin_write()?;

        let live = {
            let entries = write_txn.open_table(ENTRIES_TABLE)?;
            let expiry = write_txn.open_table(EXPIRY_TABLE)?;
            entries.get(id)?.is_some() && Self::is_live(&expiry, id, now_ms)?
        };
        if !live {
            write_txn.abort()?;
            return Ok(EntryWrite::NotFound);
        }

        if let Some(code) = new_code {
            let current = {
                let codes = write_txn.open_table(ENTRY_CODES_TABLE)?;
                codes.get(id)?.map(|value| value.value())
            };

            if current != Some(code) {
                if !Self::claim_code(&write_txn, code, id, now_ms)? {
                    write_txn.abort()?;
                    return Ok(EntryWrite::CodeInUse(code));
                }
                if let Some(old) = current {
                    Self::release_code(&write_txn, old, id)?;
                }
            }
        }

        {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            entries.insert(id, data)?;
        }

        write_txn.commit()?;
        Ok(EntryWrite::Applied)
    }

    /// List all live entries as (id, data) pairs.
    pub fn list(&self, now_ms: i64) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        let expiry = read_txn.open_table(EXPIRY_TABLE)?;

        let mut items = Vec::new();
        for row in entries.iter()? {
            let (key, value) = row?;
            if Self::is_live(&expiry, key.value(), now_ms)? {
                items.push((key.value().to_string(), value.value().to_vec()));
            }
        }
        Ok(items)
    }

    /// Delete an entry and its index rows, returns true if it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = Self::remove_in_txn(&write_txn, id)?;
        write_txn.commit()?;
        Ok(removed)
    }

    /// Remove every entry whose expiry is at or before `now_ms`.
    pub fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let write_txn = self.db.begin_write()?;

        let expired: Vec<String> = {
            let expiry_index = write_txn.open_table(EXPIRY_INDEX_TABLE)?;
            let upper = expiry_upper_bound(now_ms);
            let mut ids = Vec::new();
            for row in expiry_index.range(..upper.as_str())? {
                let (_key, id) = row?;
                ids.push(id.value().to_string());
            }
            ids
        };

        if expired.is_empty() {
            write_txn.abort()?;
            return Ok(0);
        }

        for id in &expired {
            Self::remove_in_txn(&write_txn, id)?;
        }
        write_txn.commit()?;

        debug!(count = expired.len(), "Purged expired entries");
        Ok(expired.len())
    }

    fn is_live(
        expiry: &impl ReadableTable<&'static str, i64>,
        id: &str,
        now_ms: i64,
    ) -> Result<bool> {
        Ok(expiry
            .get(id)?
            .is_none_or(|expires_at| expires_at.value() > now_ms))
    }

    /// Point `code` at `id`. An expired holder is removed first; a live one
    /// makes the claim fail.
    fn claim_code(txn: &WriteTransaction, code: i64, id: &str, now_ms: i64) -> Result<bool> {
        let holder = {
            let index = txn.open_table(CODE_INDEX_TABLE)?;
            index.get(code)?.map(|value| value.value().to_string())
        };

        if let Some(holder) = holder {
            if holder == id {
                return Ok(true);
            }
            let holder_live = {
                let expiry = txn.open_table(EXPIRY_TABLE)?;
                Self::is_live(&expiry, &holder, now_ms)?
            };
            if holder_live {
                return Ok(false);
            }
            debug!(code, holder = %holder, "Reclaiming code from expired entry");
            Self::remove_in_txn(txn, &holder)?;
        }

        let mut index = txn.open_table(CODE_INDEX_TABLE)?;
        index.insert(code, id)?;
        let mut codes = txn.open_table(ENTRY_CODES_TABLE)?;
        codes.insert(id, code)?;
        Ok(true)
    }

    /// Drop the index slot for `code` if `id` still owns it.
    fn release_code(txn: &WriteTransaction, code: i64, id: &str) -> Result<()> {
        let mut index = txn.open_table(CODE_INDEX_TABLE)?;
        let owned = index.get(code)?.is_some_and(|holder| holder.value() == id);
        if owned {
            index.remove(code)?;
        }
        Ok(())
    }

    fn remove_in_txn(txn: &WriteTransaction, id: &str) -> Result<bool> {
        let removed = {
            let mut entries = txn.open_table(ENTRIES_TABLE)?;
            entries.remove(id)?.is_some()
        };

        let code = {
            let mut codes = txn.open_table(ENTRY_CODES_TABLE)?;
            codes.remove(id)?.map(|value| value.value())
        };
        if let Some(code) = code {
            Self::release_code(txn, code, id)?;
        }

        let expires_at = {
            let mut expiry = txn.open_table(EXPIRY_TABLE)?;
            expiry.remove(id)?.map(|value| value.value())
        };
        if let Some(expires_at) = expires_at {
            let mut expiry_index = txn.open_table(EXPIRY_INDEX_TABLE)?;
            let key = expiry_key(expires_at, id);
            expiry_index.remove(key.as_str())?;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    const NOW: i64 = 1_700_000_000_000;
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn setup() -> (EntryStorage, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("entries.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        (EntryStorage::new(db).unwrap(), dir)
    }

    #[test]
    fn create_then_lookup_by_id_and_code() {
        let (storage, _dir) = setup();

        let outcome = storage
            .create("e-1", Some(1234), NOW + DAY_MS, br#"{"title":"a"}"#, NOW)
            .unwrap();
        assert_eq!(outcome, EntryInsert::Inserted);

        assert_eq!(
            storage.get("e-1", NOW).unwrap().unwrap(),
            br#"{"title":"a"}"#
        );
        let (id, data) = storage.find_by_code(1234, NOW).unwrap().unwrap();
        assert_eq!(id, "e-1");
        assert_eq!(data, br#"{"title":"a"}"#);
        assert!(storage.code_in_use(1234, NOW).unwrap());
        assert!(!storage.code_in_use(4321, NOW).unwrap());
    }

    #[test]
    fn live_code_cannot_be_claimed_twice() {
        let (storage, _dir) = setup();
        storage
            .create("e-1", Some(1234), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        let outcome = storage
            .create("e-2", Some(1234), NOW + DAY_MS, b"{}", NOW)
            .unwrap();
        assert_eq!(outcome, EntryInsert::CodeInUse(1234));
        assert!(storage.get("e-2", NOW).unwrap().is_none());
        assert_eq!(storage.find_by_code(1234, NOW).unwrap().unwrap().0, "e-1");
    }

    #[test]
    fn entries_without_code_do_not_touch_the_index() {
        let (storage, _dir) = setup();
        storage.create("e-1", None, NOW + DAY_MS, b"{}", NOW).unwrap();
        storage.create("e-2", None, NOW + DAY_MS, b"{}", NOW).unwrap();

        assert_eq!(storage.list(NOW).unwrap().len(), 2);
    }

    #[test]
    fn expired_entries_are_invisible_before_the_sweep() {
        let (storage, _dir) = setup();
        storage
            .create("e-1", Some(7), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        let later = NOW + DAY_MS;
        assert!(storage.get("e-1", later).unwrap().is_none());
        assert!(storage.find_by_code(7, later).unwrap().is_none());
        assert!(!storage.code_in_use(7, later).unwrap());
        assert!(storage.list(later).unwrap().is_empty());
    }

    #[test]
    fn expired_holder_gives_up_its_code() {
        let (storage, _dir) = setup();
        storage
            .create("old", Some(55), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        let later = NOW + 2 * DAY_MS;
        let outcome = storage
            .create("new", Some(55), later + DAY_MS, b"{}", later)
            .unwrap();
        assert_eq!(outcome, EntryInsert::Inserted);
        assert_eq!(storage.find_by_code(55, later).unwrap().unwrap().0, "new");
        assert!(storage.get("old", NOW).unwrap().is_none());
    }

    #[test]
    fn update_moves_code_and_frees_the_old_one() {
        let (storage, _dir) = setup();
        storage
            .create("e-1", Some(1), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        let outcome = storage.update("e-1", Some(2), b"{\"v\":2}", NOW).unwrap();
        assert_eq!(outcome, EntryWrite::Applied);
        assert!(storage.find_by_code(1, NOW).unwrap().is_none());
        assert_eq!(
            storage.find_by_code(2, NOW).unwrap().unwrap().1,
            b"{\"v\":2}"
        );
    }

    #[test]
    fn update_refuses_taken_code_and_unknown_id() {
        let (storage, _dir) = setup();
        storage
            .create("e-1", Some(1), NOW + DAY_MS, b"{}", NOW)
            .unwrap();
        storage
            .create("e-2", Some(2), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        assert_eq!(
            storage.update("e-1", Some(2), b"{}", NOW).unwrap(),
            EntryWrite::CodeInUse(2)
        );
        assert_eq!(storage.find_by_code(1, NOW).unwrap().unwrap().0, "e-1");
        assert_eq!(
            storage.update("missing", None, b"{}", NOW).unwrap(),
            EntryWrite::NotFound
        );
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let (storage, _dir) = setup();
        storage
            .create("short", Some(1), NOW + 1_000, b"{}", NOW)
            .unwrap();
        storage
            .create("long", Some(2), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        assert_eq!(storage.purge_expired(NOW).unwrap(), 0);
        assert_eq!(storage.purge_expired(NOW + 1_000).unwrap(), 1);

        assert!(storage.get("short", NOW).unwrap().is_none());
        assert!(!storage.code_in_use(1, NOW).unwrap());
        assert!(storage.get("long", NOW).unwrap().is_some());
        assert_eq!(storage.purge_expired(NOW + 1_000).unwrap(), 0);
    }

    #[test]
    fn delete_clears_index_rows() {
        let (storage, _dir) = setup();
        storage
            .create("e-1", Some(9), NOW + DAY_MS, b"{}", NOW)
            .unwrap();

        assert!(storage.delete("e-1").unwrap());
        assert!(!storage.delete("e-1").unwrap());
        assert!(!storage.code_in_use(9, NOW).unwrap());
        assert_eq!(
            storage.create("e-2", Some(9), NOW + DAY_MS, b"{}", NOW).unwrap(),
            EntryInsert::Inserted
        );
    }
}
