//! Export pipeline: paginated retrieval fanned into CSV sinks.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use pindah_core::error::SourceError;
use pindah_core::{
    page_limit, Channel, Connection, CsvEntity, EntityKind, PageSource, Result, Thing, User,
};
use pindah_csv::write_stream;
use pindah_postgres::{connect, FromSourceRow, PgSource, VersionProfile};

use crate::config::MigrationConfig;

/// Drive repeated paginated queries and publish each page in order.
///
/// One retrieval is in flight at a time; the bounded output channel lets
/// the sink write page N while page N+1 is being fetched. The limit and
/// the termination total are re-derived from each page's own reported
/// total, so a source that grows or shrinks mid-export is tolerated by
/// monotonically advancing the offset and stopping against the latest
/// observed total.
async fn paginate<T, S>(
    source: &S,
    operation: &str,
    tx: mpsc::Sender<Vec<T>>,
    cancel: &CancellationToken,
) -> Result<()>
where
    T: Send,
    S: PageSource<T> + ?Sized,
{
    let mut total = source.count().await?;
    let mut offset = 0u64;
    let mut limit = page_limit(total);

    loop {
        if cancel.is_cancelled() {
            debug!(operation, offset, "cancelled between rounds");
            return Ok(());
        }

        let page = match source.fetch_page(offset, limit).await {
            Ok(page) => page,
            Err(e) => {
                return Err(SourceError::Retrieve {
                    operation: operation.to_string(),
                    offset,
                    limit,
                    message: e.to_string(),
                }
                .into());
            }
        };
        total = page.meta.total;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(operation, offset, "cancelled before publish");
                return Ok(());
            }
            sent = tx.send(page.items) => {
                // A closed channel means the sink stopped first; the
                // sink's own result carries the reason.
                if sent.is_err() {
                    return Ok(());
                }
            }
        }

        if offset + limit >= total {
            break;
        }
        offset += limit;
        limit = page_limit(total);
    }

    Ok(())
}

/// Run one entity kind's export: paginator and sink coordinated over a
/// bounded channel.
///
/// Whichever side fails first closes the channel, which stops the other
/// side cleanly, so exactly one error surfaces per kind; retrieval
/// errors take precedence. Pages written before a failure or a
/// cancellation stay in the file.
pub async fn export_entity<T, S>(source: S, path: &Path, cancel: &CancellationToken) -> Result<u64>
where
    T: CsvEntity + Send + Sync,
    S: PageSource<T>,
{
    let retrieve_op = format!("retrieving {}", T::KIND);
    let write_op = format!("writing {} to csv file", T::KIND);

    let (tx, rx) = mpsc::channel(1);

    let (retrieved, written) = tokio::join!(
        paginate(&source, &retrieve_op, tx, cancel),
        write_stream::<T>(path, &write_op, rx),
    );

    retrieved?;
    written
}

fn spawn_export<T>(
    tasks: &mut JoinSet<(EntityKind, Result<u64>)>,
    source: PgSource<T>,
    path: PathBuf,
    cancel: &CancellationToken,
) where
    T: CsvEntity + FromSourceRow + Sync,
{
    let cancel = cancel.clone();
    tasks.spawn(async move { (T::KIND, export_entity(source, &path, &cancel).await) });
}

/// Export all four entity kinds concurrently.
///
/// The kinds are independent: every pipeline runs to completion
/// regardless of the others, failures are logged per kind, and the first
/// failure (if any) is returned only after all four have finished.
pub(crate) async fn export_all(
    config: &MigrationConfig,
    profile: VersionProfile,
    cancel: &CancellationToken,
) -> Result<()> {
    let users_pool = connect(&config.users_db).await?;
    debug!("connected to users database");

    let things_pool = connect(&config.things_db).await?;
    debug!("connected to things database");

    let mut tasks: JoinSet<(EntityKind, Result<u64>)> = JoinSet::new();
    spawn_export::<User>(
        &mut tasks,
        PgSource::new(users_pool, EntityKind::Users, profile.users),
        config.paths.users.clone(),
        cancel,
    );
    spawn_export::<Thing>(
        &mut tasks,
        PgSource::new(things_pool.clone(), EntityKind::Things, profile.things),
        config.paths.things.clone(),
        cancel,
    );
    spawn_export::<Channel>(
        &mut tasks,
        PgSource::new(things_pool.clone(), EntityKind::Channels, profile.channels),
        config.paths.channels.clone(),
        cancel,
    );
    spawn_export::<Connection>(
        &mut tasks,
        PgSource::new(things_pool, EntityKind::Connections, profile.connections),
        config.paths.connections.clone(),
        cancel,
    );

    let mut first_err = None;
    while let Some(joined) = tasks.join_next().await {
        let (kind, result) = joined.expect("export task panicked");
        match result {
            Ok(rows) => info!(%kind, rows, "finished exporting"),
            Err(e) => {
                error!(%kind, error = %e, "export failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
