//! pindah-migrate - Export and import pipelines and the migration
//! orchestrator.
//!
//! Export reads every record of each entity kind from the source
//! database through a self-tuning paginator and streams them into one
//! CSV file per kind. Import replays those files against the destination
//! platform's create-API in bounded concurrent batches. The CSV files
//! are the only state shared between the two halves.

mod config;
mod export;
mod import;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use pindah_core::error::ConfigError;
use pindah_core::Result;
use pindah_postgres::VersionProfile;
use pindah_sdk::{HttpPlatform, SdkConfig};

pub use config::{CsvPaths, MigrationConfig, Operation, DEF_BATCH_SIZE, DEF_CONCURRENCY, IMPORT_VERSION};
pub use export::export_entity;
pub use import::import_all;

/// Run the migration selected by the configuration's
/// `(from_version, to_version, operation)` triple.
///
/// Any combination other than an export from a known source version or
/// an import to the supported destination version is rejected outright;
/// there is no retry path.
pub async fn migrate(config: &MigrationConfig, cancel: &CancellationToken) -> Result<()> {
    match config.operation {
        Operation::Export => {
            let Some(profile) = VersionProfile::for_export(&config.from_version) else {
                return Err(unsupported(config));
            };
            info!(version = %config.from_version, "starting export");
            export::export_all(config, profile, cancel).await?;
            info!(version = %config.from_version, "finished export");
            Ok(())
        }
        Operation::Import => {
            if config.to_version != IMPORT_VERSION {
                return Err(unsupported(config));
            }
            info!(version = %config.to_version, "starting import");
            let platform = HttpPlatform::new(SdkConfig {
                users_url: config.users_url.clone(),
                things_url: config.things_url.clone(),
            });
            import::import_all(config, Arc::new(platform), cancel).await?;
            info!(version = %config.to_version, "finished import");
            Ok(())
        }
    }
}

fn unsupported(config: &MigrationConfig) -> pindah_core::Error {
    ConfigError::UnsupportedMigration {
        from: config.from_version.clone(),
        to: config.to_version.clone(),
        operation: config.operation.to_string(),
    }
    .into()
}
