//! Job stores for cronhook.
//!
//! [`MemoryJobStore`] keeps everything in process and is used by tests and
//! the `memory` backend. [`SqliteJobStore`] persists to a SQLite file.

mod memory;
mod schema;
mod sqlite;


pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;
