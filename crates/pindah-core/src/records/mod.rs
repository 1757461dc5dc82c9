//! Migrated record types and their CSV layout.

mod csv;
mod types;

pub use csv::CsvEntity;
pub use types::{Channel, Connection, EntityKind, EntityPage, PageMeta, Thing, User};
