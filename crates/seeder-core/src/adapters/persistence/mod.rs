//! # Persistence Adapters
//!
//! The address book on disk: a binary snapshot guarded by a digest
//! trailer, and a human-readable dump of every peer that ever answered.

mod dump;
mod hashing_io;
mod snapshot;

pub use dump::{render_dump, write_dump};
pub use hashing_io::{HashingReader, HashingWriter};
pub use snapshot::{load_snapshot, save_snapshot, PersistenceError};
