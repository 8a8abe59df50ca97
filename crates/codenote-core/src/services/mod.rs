pub mod entry;
pub mod expiry;

pub use entry::{
    Clock, DEFAULT_RETENTION_DAYS, EntryError, EntryService, MAX_RETENTION_DAYS, Retrieval,
};
pub use expiry::{DEFAULT_SWEEP_INTERVAL, ExpirySweeper};
