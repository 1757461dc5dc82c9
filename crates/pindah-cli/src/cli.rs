//! CLI argument definitions.
//!
//! Every flag is also settable through a `PINDAH_*` environment
//! variable, keeping deployments scriptable without wrapper shells.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pindah_core::Credentials;
use pindah_migrate::{CsvPaths, MigrationConfig, Operation, DEF_BATCH_SIZE, DEF_CONCURRENCY};
use pindah_postgres::DbConfig;
use pindah_sdk::BaseUrl;

/// Migration tool for multi-tenant IoT platform deployments.
///
/// Exports users, things, channels, and their connections from one
/// deployment's databases into CSV files, and imports those files into
/// a newer deployment through its API.
#[derive(Parser, Debug)]
#[command(name = "pindah")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Platform version to migrate from
    #[arg(short = 'f', long, default_value = "0.13.0", env = "PINDAH_FROM_VERSION")]
    pub from_version: String,

    /// Platform version to migrate to
    #[arg(short = 't', long, default_value = "0.14.0", env = "PINDAH_TO_VERSION")]
    pub to_version: String,

    /// Export data from the source or import data into a new deployment
    #[arg(short = 'o', long, default_value = "export", env = "PINDAH_OPERATION")]
    pub operation: String,

    /// Users database host
    #[arg(long, default_value = "localhost", env = "PINDAH_USERS_DB_HOST")]
    pub users_db_host: String,

    /// Users database port
    #[arg(long, default_value_t = 5432, env = "PINDAH_USERS_DB_PORT")]
    pub users_db_port: u16,

    /// Users database user
    #[arg(long, default_value = "platform", env = "PINDAH_USERS_DB_USER")]
    pub users_db_user: String,

    /// Users database password
    #[arg(long, default_value = "platform", env = "PINDAH_USERS_DB_PASS")]
    pub users_db_pass: String,

    /// Users database name
    #[arg(long, default_value = "users", env = "PINDAH_USERS_DB")]
    pub users_db: String,

    /// Users database SSL mode
    #[arg(long, default_value = "disable", env = "PINDAH_USERS_DB_SSL_MODE")]
    pub users_db_ssl_mode: String,

    /// Things database host
    #[arg(long, default_value = "localhost", env = "PINDAH_THINGS_DB_HOST")]
    pub things_db_host: String,

    /// Things database port
    #[arg(long, default_value_t = 5432, env = "PINDAH_THINGS_DB_PORT")]
    pub things_db_port: u16,

    /// Things database user
    #[arg(long, default_value = "platform", env = "PINDAH_THINGS_DB_USER")]
    pub things_db_user: String,

    /// Things database password
    #[arg(long, default_value = "platform", env = "PINDAH_THINGS_DB_PASS")]
    pub things_db_pass: String,

    /// Things database name
    #[arg(long, default_value = "things", env = "PINDAH_THINGS_DB")]
    pub things_db: String,

    /// Things database SSL mode
    #[arg(long, default_value = "disable", env = "PINDAH_THINGS_DB_SSL_MODE")]
    pub things_db_ssl_mode: String,

    /// Users CSV file path
    #[arg(long, default_value = "csv/users.csv", env = "PINDAH_USERS_CSV_PATH")]
    pub users_csv: PathBuf,

    /// Things CSV file path
    #[arg(long, default_value = "csv/things.csv", env = "PINDAH_THINGS_CSV_PATH")]
    pub things_csv: PathBuf,

    /// Channels CSV file path
    #[arg(long, default_value = "csv/channels.csv", env = "PINDAH_CHANNELS_CSV_PATH")]
    pub channels_csv: PathBuf,

    /// Connections CSV file path
    #[arg(
        long,
        default_value = "csv/connections.csv",
        env = "PINDAH_CONNECTIONS_CSV_PATH"
    )]
    pub connections_csv: PathBuf,

    /// Destination users service base URL
    #[arg(long, default_value = "http://localhost", env = "PINDAH_USERS_URL")]
    pub users_url: String,

    /// Destination things service base URL
    #[arg(long, default_value = "http://localhost", env = "PINDAH_THINGS_URL")]
    pub things_url: String,

    /// Operator identity for the destination platform
    #[arg(long, default_value = "admin@example.com", env = "PINDAH_USER_IDENTITY")]
    pub user_identity: String,

    /// Operator secret for the destination platform
    #[arg(long, default_value = "12345678", env = "PINDAH_USER_SECRET")]
    pub user_secret: String,

    /// Records per creation batch
    #[arg(long, default_value_t = DEF_BATCH_SIZE, env = "PINDAH_BATCH_SIZE")]
    pub batch_size: usize,

    /// Concurrently in-flight creation calls per kind
    #[arg(long, default_value_t = DEF_CONCURRENCY, env = "PINDAH_CONCURRENCY")]
    pub concurrency: usize,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Assemble the migration configuration from the parsed arguments.
    pub fn migration_config(&self) -> Result<MigrationConfig> {
        let operation: Operation = self
            .operation
            .parse()
            .with_context(|| format!("unknown operation '{}'", self.operation))?;

        let users_url =
            BaseUrl::new(&self.users_url).context("invalid users service URL")?;
        let things_url =
            BaseUrl::new(&self.things_url).context("invalid things service URL")?;

        Ok(MigrationConfig {
            from_version: self.from_version.clone(),
            to_version: self.to_version.clone(),
            operation,
            users_db: DbConfig {
                host: self.users_db_host.clone(),
                port: self.users_db_port,
                user: self.users_db_user.clone(),
                password: self.users_db_pass.clone(),
                name: self.users_db.clone(),
                ssl_mode: self.users_db_ssl_mode.clone(),
            },
            things_db: DbConfig {
                host: self.things_db_host.clone(),
                port: self.things_db_port,
                user: self.things_db_user.clone(),
                password: self.things_db_pass.clone(),
                name: self.things_db.clone(),
                ssl_mode: self.things_db_ssl_mode.clone(),
            },
            paths: CsvPaths {
                users: self.users_csv.clone(),
                things: self.things_csv.clone(),
                channels: self.channels_csv.clone(),
                connections: self.connections_csv.clone(),
            },
            users_url,
            things_url,
            credentials: Credentials::new(&self.user_identity, &self.user_secret),
            batch_size: self.batch_size,
            concurrency: self.concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_an_export_config() {
        let cli = Cli::parse_from(["pindah"]);
        let config = cli.migration_config().unwrap();

        assert_eq!(config.operation, Operation::Export);
        assert_eq!(config.from_version, "0.13.0");
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.paths.users, PathBuf::from("csv/users.csv"));
    }

    #[test]
    fn short_flags_select_the_migration() {
        let cli = Cli::parse_from(["pindah", "-f", "0.11.0", "-t", "0.14.0", "-o", "import"]);
        let config = cli.migration_config().unwrap();

        assert_eq!(config.operation, Operation::Import);
        assert_eq!(config.from_version, "0.11.0");
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let cli = Cli::parse_from(["pindah", "-o", "sync"]);
        assert!(cli.migration_config().is_err());
    }
}
