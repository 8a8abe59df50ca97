//! Entry service: validation, code uniqueness and the security challenge.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CodeStatus, Entry, EntryUpdate, NewEntry, RetrievedEntry, ValidationError};
use crate::storage::{EntryInsert, EntryStore, EntryWrite};

/// Days an entry lives before it is removed.
pub const DEFAULT_RETENTION_DAYS: i64 = 31;

/// Upper bound accepted for a configured retention.
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Code {0} is already in use")]
    CodeConflict(i64),

    #[error("No data found for code {0}")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Outcome of a retrieve that found a live entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    Unlocked(RetrievedEntry),
    ChallengeRequired { question: String },
}

#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn EntryStore>,
    retention: Duration,
    clock: Clock,
}

impl EntryService {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Save a new entry. Fails if the text is empty or the code is held by a
    /// live entry.
    pub fn create(&self, input: NewEntry) -> Result<Entry, EntryError> {
        let input = input.validate()?;
        let now = self.now();
        let expires_at = now.checked_add_signed(self.retention).ok_or_else(|| {
            anyhow::anyhow!("Retention of {} days overflows the expiry time", self.retention.num_days())
        })?;

        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            code: input.code,
            security_question: input.security_question,
            security_answer: input.security_answer,
            created_at: now,
            expires_at,
        };

        match self.store.insert(&entry, now)? {
            EntryInsert::Inserted => {
                info!(
                    entry_id = %entry.id,
                    code = ?entry.code,
                    restricted = entry.is_restricted(),
                    "Entry saved"
                );
                Ok(entry)
            }
            EntryInsert::CodeInUse(code) => {
                debug!(code, "Rejected save, code in use");
                Err(EntryError::CodeConflict(code))
            }
        }
    }

    /// Save a bare code, with a title defaulting to `Code: {code}`.
    pub fn save_code(&self, code: i64, title: Option<String>) -> Result<Entry, EntryError> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Code: {}", code));
        self.create(NewEntry::new(title).with_code(code))
    }

    pub fn find_by_code(&self, code: i64) -> Result<Option<Entry>, EntryError> {
        Ok(self.store.find_by_code(code, self.now())?)
    }

    /// Look up an entry by code, enforcing the security challenge.
    pub fn retrieve(&self, code: i64, answer: Option<&str>) -> Result<Retrieval, EntryError> {
        let entry = self
            .find_by_code(code)?
            .ok_or(EntryError::NotFound(code))?;

        if let Some(question) = entry.challenge()
            && !entry.answer_matches(answer)
        {
            debug!(code, answered = answer.is_some(), "Security answer required");
            return Ok(Retrieval::ChallengeRequired {
                question: question.to_string(),
            });
        }

        Ok(Retrieval::Unlocked(entry.to_retrieved()))
    }

    /// Apply a partial update to the entry holding `code`.
    pub fn update(&self, code: i64, update: EntryUpdate) -> Result<Entry, EntryError> {
        let now = self.now();
        let mut entry = self
            .store
            .find_by_code(code, now)?
            .ok_or(EntryError::NotFound(code))?;

        if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
            entry.title = title;
        }
        if let Some(new_code) = update.new_code {
            entry.code = Some(new_code);
        }

        match self.store.replace(&entry, now)? {
            EntryWrite::Applied => {
                info!(entry_id = %entry.id, code = ?entry.code, "Entry updated");
                Ok(entry)
            }
            EntryWrite::CodeInUse(taken) => Err(EntryError::CodeConflict(taken)),
            // Expired or removed between the lookup and the write.
            EntryWrite::NotFound => Err(EntryError::NotFound(code)),
        }
    }

    /// Availability check for a code; `Some` when a live entry holds it.
    pub fn check_code_exists(&self, code: i64) -> Result<Option<CodeStatus>, EntryError> {
        Ok(self
            .find_by_code(code)?
            .map(|entry| entry.to_code_status(code)))
    }

    /// All live entries, newest first.
    pub fn list_recent(&self) -> Result<Vec<Entry>, EntryError> {
        let mut entries = self.store.list(self.now())?;
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Remove expired entries from the store.
    pub fn purge_expired(&self) -> Result<usize, EntryError> {
        Ok(self.store.purge_expired(self.now())?)
    }
}
