mod in_memory;
mod log;
pub mod persistent;
pub mod record;

pub use in_memory::{rank, EntryIndex};
pub use log::{RecordLog, ReplayStats};
pub use persistent::{CompactionStats, PersistentVectorStore};
