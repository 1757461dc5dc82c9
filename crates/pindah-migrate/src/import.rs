//! Import pipeline: batched CSV replay against the destination platform.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use pindah_core::error::ApiError;
use pindah_core::{
    AccessToken, Channel, Connection, CsvEntity, EntityKind, Error, Platform, Result, Thing, User,
};
use pindah_csv::{read_all, read_batches};

use crate::config::MigrationConfig;

/// Email-to-identifier lookup over the exported users file.
///
/// The file is read in full once and scanned linearly per lookup; user
/// counts are small next to things and channels. An unresolved email
/// falls back to the raw string, a leniency kept from the source
/// system, even though it can leave a dangling owner reference on the
/// destination.
pub(crate) struct OwnerIndex {
    rows: Vec<Vec<String>>,
}

impl OwnerIndex {
    /// Load the exported users file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            rows: read_all(path, "retrieving users")?,
        })
    }

    /// Resolve an owner email to the user identifier recorded on export.
    ///
    /// Exports from versions without a user id column record an empty
    /// identifier; those users stay keyed by email.
    pub fn resolve(&self, email: &str) -> String {
        if email.is_empty() {
            return String::new();
        }
        for row in &self.rows {
            if row.len() >= 2 && row[1] == email && !row[0].is_empty() {
                return row[0].clone();
            }
        }
        email.to_string()
    }
}

fn batch_error(operation: &str, ids: Vec<String>, err: Error) -> Error {
    ApiError::Batch {
        operation: operation.to_string(),
        ids,
        message: err.to_string(),
    }
    .into()
}

fn collect_result(
    joined: std::result::Result<Result<()>, JoinError>,
    first_err: &mut Option<Error>,
) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            if first_err.is_none() {
                *first_err = Some(e);
            }
        }
        Err(e) => {
            if first_err.is_none() {
                *first_err = Some(
                    ApiError::Http {
                        message: format!("batch task failed: {}", e),
                    }
                    .into(),
                );
            }
        }
    }
}

/// Decode raw CSV rows into creation requests and submit them in
/// bounded concurrent batches.
///
/// Each full batch is dispatched on its own task behind a semaphore
/// sized to the concurrency limit; the final partial batch is always
/// flushed after the input stream ends. The first error from any batch
/// is returned only after every in-flight submission has completed, so
/// no dispatched work is silently lost. Cancellation skips undispatched
/// batches (including the final flush) and still drains in-flight work.
///
/// Returns the number of records submitted.
pub(crate) async fn create_in_batches<T, D, F, Fut>(
    mut rx: mpsc::Receiver<Vec<String>>,
    decode: D,
    submit: F,
    batch_size: usize,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<u64>
where
    T: Send + 'static,
    D: Fn(Vec<String>) -> Result<T> + Send,
    F: Fn(Vec<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    let mut batch: Vec<T> = Vec::with_capacity(batch_size);
    let mut first_err: Option<Error> = None;
    let mut submitted = 0u64;

    loop {
        let fields = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled, skipping undispatched batches");
                break;
            }
            received = rx.recv() => match received {
                Some(fields) => fields,
                None => break,
            },
        };

        match decode(fields) {
            Ok(record) => batch.push(record),
            Err(e) => {
                first_err = Some(e);
                break;
            }
        }

        if batch.len() >= batch_size {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore closed");
            submitted += batch.len() as u64;
            let call = submit(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
            tasks.spawn(async move {
                let _permit = permit;
                call.await
            });
        }
    }

    // Flush the final partial batch, unless a decode error or a
    // cancellation already stopped the stream.
    if first_err.is_none() && !cancel.is_cancelled() && !batch.is_empty() {
        submitted += batch.len() as u64;
        if let Err(e) = submit(batch).await {
            first_err = Some(e);
        }
    }

    // Every in-flight submission completes before any error surfaces.
    while let Some(joined) = tasks.join_next().await {
        collect_result(joined, &mut first_err);
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(submitted),
    }
}

/// Consume the whole connection stream, then issue one connect-call per
/// channel group.
///
/// The connect API accepts one channel with many thing identifiers per
/// call, so edges are grouped by channel and deduplicated per channel
/// before any dispatch. Groups are submitted concurrently behind the
/// same semaphore discipline as record batches.
async fn load_connections<P>(
    mut rx: mpsc::Receiver<Vec<String>>,
    platform: Arc<P>,
    token: AccessToken,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<u64>
where
    P: Platform + 'static,
{
    let mut things_by_channel: HashMap<String, Vec<String>> = HashMap::new();

    loop {
        let fields = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled, skipping undispatched connections");
                return Ok(0);
            }
            received = rx.recv() => match received {
                Some(fields) => fields,
                None => break,
            },
        };

        let edge = Connection::from_fields(&fields)?;
        let things = things_by_channel.entry(edge.channel_id).or_default();
        if !things.contains(&edge.thing_id) {
            things.push(edge.thing_id);
        }
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    let mut first_err: Option<Error> = None;
    let mut groups = 0u64;

    for (channel_id, thing_ids) in things_by_channel {
        if cancel.is_cancelled() {
            break;
        }
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed");
        let platform = Arc::clone(&platform);
        let token = token.clone();
        groups += 1;
        tasks.spawn(async move {
            let _permit = permit;
            let result = platform.connect(&channel_id, &thing_ids, &token).await;
            result.map_err(|e| batch_error("creating connections", vec![channel_id], e))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        collect_result(joined, &mut first_err);
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(groups),
    }
}

/// Run one kind's import: batch reader and loader coordinated over a
/// bounded channel, mirroring the export pipeline in reverse.
async fn import_entity<T, D, F, Fut>(
    path: &Path,
    operation: &str,
    decode: D,
    submit: F,
    batch_size: usize,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<u64>
where
    T: Send + 'static,
    D: Fn(Vec<String>) -> Result<T> + Send,
    F: Fn(Vec<T>) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let pair_cancel = cancel.child_token();
    let (tx, rx) = mpsc::channel(batch_size.max(1));

    let loader = create_in_batches(
        rx,
        decode,
        submit,
        batch_size,
        concurrency,
        pair_cancel.clone(),
    );
    let reader = async {
        let result = read_batches(path, operation, tx).await;
        if result.is_err() {
            // Stop the loader from flushing or dispatching further work
            // against a half-read file.
            pair_cancel.cancel();
        }
        result
    };

    let (read, loaded) = tokio::join!(reader, loader);
    read?;
    loaded
}

async fn import_users<P>(
    config: &MigrationConfig,
    platform: Arc<P>,
    token: &AccessToken,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: Platform + 'static,
{
    let operation = "creating users";

    let submit = {
        let token = token.clone();
        move |batch: Vec<User>| {
            let platform = Arc::clone(&platform);
            let token = token.clone();
            async move {
                let ids: Vec<String> = batch.iter().map(|u| u.id.clone()).collect();
                match platform.create_users(&batch, &token).await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(batch_error("creating users", ids, e)),
                }
            }
        }
    };

    import_entity(
        &config.paths.users,
        operation,
        |fields: Vec<String>| User::from_fields(&fields),
        submit,
        config.batch_size,
        config.concurrency,
        cancel,
    )
    .await
}

async fn import_things<P>(
    config: &MigrationConfig,
    platform: Arc<P>,
    token: &AccessToken,
    owners: &OwnerIndex,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: Platform + 'static,
{
    let operation = "creating things";

    let decode = move |fields: Vec<String>| -> Result<Thing> {
        let mut thing = Thing::from_fields(&fields)?;
        thing.owner = owners.resolve(&thing.owner);
        Ok(thing)
    };

    let submit = {
        let token = token.clone();
        move |batch: Vec<Thing>| {
            let platform = Arc::clone(&platform);
            let token = token.clone();
            async move {
                let ids: Vec<String> = batch.iter().map(|t| t.id.clone()).collect();
                match platform.create_things(&batch, &token).await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(batch_error("creating things", ids, e)),
                }
            }
        }
    };

    import_entity(
        &config.paths.things,
        operation,
        decode,
        submit,
        config.batch_size,
        config.concurrency,
        cancel,
    )
    .await
}

async fn import_channels<P>(
    config: &MigrationConfig,
    platform: Arc<P>,
    token: &AccessToken,
    owners: &OwnerIndex,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: Platform + 'static,
{
    let operation = "creating channels";

    let decode = move |fields: Vec<String>| -> Result<Channel> {
        let mut channel = Channel::from_fields(&fields)?;
        channel.owner = owners.resolve(&channel.owner);
        Ok(channel)
    };

    let submit = {
        let token = token.clone();
        move |batch: Vec<Channel>| {
            let platform = Arc::clone(&platform);
            let token = token.clone();
            async move {
                let ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
                match platform.create_channels(&batch, &token).await {
                    Ok(_) => Ok(()),
                    Err(e) => Err(batch_error("creating channels", ids, e)),
                }
            }
        }
    };

    import_entity(
        &config.paths.channels,
        operation,
        decode,
        submit,
        config.batch_size,
        config.concurrency,
        cancel,
    )
    .await
}

async fn import_connections<P>(
    config: &MigrationConfig,
    platform: Arc<P>,
    token: &AccessToken,
    cancel: &CancellationToken,
) -> Result<u64>
where
    P: Platform + 'static,
{
    let operation = "creating connections";

    let pair_cancel = cancel.child_token();
    let (tx, rx) = mpsc::channel(config.batch_size.max(1));

    let loader = load_connections(
        rx,
        platform,
        token.clone(),
        config.concurrency,
        pair_cancel.clone(),
    );
    let reader = async {
        let result = read_batches(&config.paths.connections, operation, tx).await;
        if result.is_err() {
            pair_cancel.cancel();
        }
        result
    };

    let (read, loaded) = tokio::join!(reader, loader);
    read?;
    loaded
}

fn note_result(kind: EntityKind, result: Result<u64>, first_err: &mut Option<Error>) -> Result<()> {
    match result {
        Ok(count) => {
            info!(%kind, count, "finished creating");
            Ok(())
        }
        Err(e) if e.is_auth_error() => {
            error!(%kind, error = %e, "authentication rejected, aborting import");
            Err(e)
        }
        Err(e) => {
            error!(%kind, error = %e, "import failed");
            if first_err.is_none() {
                *first_err = Some(e);
            }
            Ok(())
        }
    }
}

/// Import all entity kinds, in dependency order.
///
/// Users, things, and channels must exist before connections refer to
/// them, and users before ownership fields resolve, so the kinds run
/// sequentially: users, things, channels, connections. A kind's failure
/// is logged and the remaining kinds still run; only an authentication
/// failure aborts the whole import. The first failure (if any) is
/// returned after every kind has been attempted.
pub async fn import_all<P>(
    config: &MigrationConfig,
    platform: Arc<P>,
    cancel: &CancellationToken,
) -> Result<()>
where
    P: Platform + 'static,
{
    let token = match platform.create_token(&config.credentials).await {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "failed to create token, aborting import");
            return Err(e);
        }
    };
    debug!("created operator token");

    let owners = OwnerIndex::load(&config.paths.users)?;

    let mut first_err: Option<Error> = None;

    note_result(
        EntityKind::Users,
        import_users(config, Arc::clone(&platform), &token, cancel).await,
        &mut first_err,
    )?;
    if cancel.is_cancelled() {
        return Ok(());
    }

    note_result(
        EntityKind::Things,
        import_things(config, Arc::clone(&platform), &token, &owners, cancel).await,
        &mut first_err,
    )?;
    if cancel.is_cancelled() {
        return Ok(());
    }

    note_result(
        EntityKind::Channels,
        import_channels(config, Arc::clone(&platform), &token, &owners, cancel).await,
        &mut first_err,
    )?;
    if cancel.is_cancelled() {
        return Ok(());
    }

    note_result(
        EntityKind::Connections,
        import_connections(config, platform, &token, cancel).await,
        &mut first_err,
    )?;

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
