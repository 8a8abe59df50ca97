pub mod http;
pub mod models;
pub mod paths;
pub mod services;
pub mod storage;

pub use models::*;

use chrono::Duration;
use services::{Clock, EntryService};
use std::path::Path;
use std::sync::Arc;
use storage::Storage;
use tracing::info;

/// Core application state shared by the HTTP handlers and the expiry sweeper
pub struct AppCore {
    pub entries: EntryService,
}

impl AppCore {
    /// Open the database at `db_path` and build the entry service on top of it.
    pub fn new(db_path: impl AsRef<Path>, retention: Duration) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();
        let storage = Storage::new(db_path)?;
        let entries = EntryService::new(Arc::new(storage.entries)).with_retention(retention);

        info!(
            db_path = %db_path.display(),
            retention_days = retention.num_days(),
            "Initializing Codenote"
        );

        Ok(Self { entries })
    }

    /// Replace the service clock, used to exercise expiry without waiting.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.entries = self.entries.with_clock(clock);
        self
    }
}
