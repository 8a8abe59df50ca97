pub mod entry;
pub mod validation;

pub use entry::{
    CodeInput, CodeStatus, Entry, EntryRecord, EntryUpdate, NewEntry, RetrievedEntry, parse_code,
};
pub use validation::ValidationError;
