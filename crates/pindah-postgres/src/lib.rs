//! pindah-postgres - Postgres-backed source database access.

mod config;
mod queries;
mod source;

pub use config::{connect, DbConfig};
pub use queries::{EntityQueries, VersionProfile};
pub use source::{FromSourceRow, PgSource};
