//! pindah-csv - CSV sink and source for migration files.
//!
//! The CSV file is the sole persisted intermediate state between an
//! export and an import, and is treated as authoritative on import.

mod sink;
mod source;

pub use sink::write_stream;
pub use source::{read_all, read_batches};
