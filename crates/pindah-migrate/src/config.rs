//! Migration run configuration.
//!
//! Every tunable travels in one explicit value built by the CLI layer;
//! the pipelines hold no global state.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use pindah_core::error::ConfigError;
use pindah_core::{Credentials, Error};
use pindah_postgres::DbConfig;
use pindah_sdk::BaseUrl;

/// The destination platform version imports are supported against.
pub const IMPORT_VERSION: &str = "0.14.0";

/// Default number of records per creation batch.
pub const DEF_BATCH_SIZE: usize = 100;

/// Default number of concurrently in-flight creation calls per kind.
pub const DEF_CONCURRENCY: usize = 10;

/// The migration direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Bulk-read the source database and serialize to CSV.
    Export,
    /// Read CSV and re-create the records on the destination.
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Export => write!(f, "export"),
            Operation::Import => write!(f, "import"),
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(Operation::Export),
            "import" => Ok(Operation::Import),
            other => Err(ConfigError::UnsupportedMigration {
                from: String::new(),
                to: String::new(),
                operation: other.to_string(),
            }
            .into()),
        }
    }
}

/// Locations of the four per-kind CSV files.
#[derive(Debug, Clone)]
pub struct CsvPaths {
    pub users: PathBuf,
    pub things: PathBuf,
    pub channels: PathBuf,
    pub connections: PathBuf,
}

/// Full configuration for one migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub from_version: String,
    pub to_version: String,
    pub operation: Operation,
    /// Source users database (export only).
    pub users_db: DbConfig,
    /// Source things database (export only).
    pub things_db: DbConfig,
    pub paths: CsvPaths,
    /// Destination users service (import only).
    pub users_url: BaseUrl,
    /// Destination things service (import only).
    pub things_url: BaseUrl,
    /// Operator credentials for the destination (import only).
    pub credentials: Credentials,
    pub batch_size: usize,
    pub concurrency: usize,
}
