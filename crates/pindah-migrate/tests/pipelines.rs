//! Pipeline tests over in-memory source and platform doubles.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pindah_core::error::SourceError;
use pindah_core::{
    AccessToken, Channel, Connection, Credentials, EntityPage, Metadata, PageMeta, PageSource,
    Platform, Result, Thing, User,
};
use pindah_migrate::{
    export_entity, import_all, migrate, CsvPaths, MigrationConfig, Operation,
};
use pindah_postgres::DbConfig;
use pindah_sdk::BaseUrl;

// ============================================================================
// Doubles
// ============================================================================

/// In-memory page source. `first_count` lets a test report a stale total
/// on the initial count while every fetched page reports the real one,
/// simulating a source that grows or shrinks mid-export.
struct VecSource<T> {
    items: Vec<T>,
    first_count: u64,
    fetches: AtomicUsize,
    cancel_on_fetch: Option<(usize, CancellationToken)>,
    fail_at_offset: Option<u64>,
}

impl<T: Clone> VecSource<T> {
    fn new(items: Vec<T>) -> Self {
        let first_count = items.len() as u64;
        Self {
            items,
            first_count,
            fetches: AtomicUsize::new(0),
            cancel_on_fetch: None,
            fail_at_offset: None,
        }
    }
}

#[async_trait]
impl<T> PageSource<T> for VecSource<T>
where
    T: Clone + Send + Sync,
{
    async fn count(&self) -> Result<u64> {
        Ok(self.first_count)
    }

    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<EntityPage<T>> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_fetch {
            if fetch == *at {
                token.cancel();
            }
        }
        if self.fail_at_offset == Some(offset) {
            return Err(SourceError::Query {
                message: "connection reset".to_string(),
            }
            .into());
        }

        let len = self.items.len() as u64;
        let start = offset.min(len) as usize;
        let end = (offset + limit).min(len) as usize;
        Ok(EntityPage {
            items: self.items[start..end].to_vec(),
            meta: PageMeta {
                total: len,
                offset,
                limit,
            },
        })
    }
}

/// Platform double that records every creation and honors the
/// client-supplied identifiers, like the real destination.
#[derive(Default)]
struct RecordingPlatform {
    fail_token: bool,
    fail_things: bool,
    users: Mutex<Vec<User>>,
    things: Mutex<Vec<Thing>>,
    channels: Mutex<Vec<Channel>>,
    connects: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn create_token(&self, _credentials: &Credentials) -> Result<AccessToken> {
        if self.fail_token {
            return Err(pindah_core::error::ApiError::Auth {
                message: "invalid credentials".to_string(),
            }
            .into());
        }
        Ok(AccessToken::new("token"))
    }

    async fn create_users(&self, users: &[User], _token: &AccessToken) -> Result<Vec<User>> {
        self.users.lock().unwrap().extend_from_slice(users);
        Ok(users.to_vec())
    }

    async fn create_things(&self, things: &[Thing], _token: &AccessToken) -> Result<Vec<Thing>> {
        if self.fail_things {
            return Err(pindah_core::error::ApiError::Http {
                message: "boom".to_string(),
            }
            .into());
        }
        self.things.lock().unwrap().extend_from_slice(things);
        Ok(things.to_vec())
    }

    async fn create_channels(
        &self,
        channels: &[Channel],
        _token: &AccessToken,
    ) -> Result<Vec<Channel>> {
        self.channels.lock().unwrap().extend_from_slice(channels);
        Ok(channels.to_vec())
    }

    async fn connect(
        &self,
        channel_id: &str,
        thing_ids: &[String],
        _token: &AccessToken,
    ) -> Result<()> {
        self.connects
            .lock()
            .unwrap()
            .push((channel_id.to_string(), thing_ids.to_vec()));
        Ok(())
    }
}

fn user(id: &str, email: &str, password: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        metadata: Metadata::new(),
    }
}

fn config_for(dir: &Path) -> MigrationConfig {
    let db = DbConfig {
        host: "localhost".to_string(),
        port: 5432,
        user: "platform".to_string(),
        password: "platform".to_string(),
        name: "unused".to_string(),
        ssl_mode: "disable".to_string(),
    };
    MigrationConfig {
        from_version: "0.13.0".to_string(),
        to_version: "0.14.0".to_string(),
        operation: Operation::Import,
        users_db: db.clone(),
        things_db: db,
        paths: CsvPaths {
            users: dir.join("users.csv"),
            things: dir.join("things.csv"),
            channels: dir.join("channels.csv"),
            connections: dir.join("connections.csv"),
        },
        users_url: BaseUrl::new("http://localhost:9002").unwrap(),
        things_url: BaseUrl::new("http://localhost:9000").unwrap(),
        credentials: Credentials::new("admin@example.com", "12345678"),
        batch_size: 100,
        concurrency: 4,
    }
}

fn data_rows(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Paginator / export pipeline
// ============================================================================

#[tokio::test]
async fn export_publishes_every_row_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    // 250 rows paginate as 100 + 100 + 50 under the first limit bucket.
    let users: Vec<User> = (0..250)
        .map(|i| user(&format!("u{:03}", i), &format!("u{:03}@x.com", i), "pw"))
        .collect();
    let source = VecSource::new(users.clone());

    let rows = export_entity(source, &path, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows, 250);

    let lines = data_rows(&path);
    assert_eq!(lines.len(), 250);
    for (i, line) in lines.iter().enumerate() {
        assert!(
            line.starts_with(&format!("u{:03},", i)),
            "row {} out of order: {}",
            i,
            line
        );
    }
}

#[tokio::test]
async fn export_tolerates_total_growing_mid_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    // The initial count sees 120 rows; by the first fetch the source
    // holds 130. The paginator keeps advancing against the latest
    // observed total and picks up the growth.
    let users: Vec<User> = (0..130)
        .map(|i| user(&format!("u{:03}", i), &format!("u{:03}@x.com", i), "pw"))
        .collect();
    let mut source = VecSource::new(users);
    source.first_count = 120;

    let rows = export_entity(source, &path, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows, 130);
    assert_eq!(data_rows(&path).len(), 130);
}

#[tokio::test]
async fn export_tolerates_total_shrinking_mid_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    // The initial count sees 300 rows; the source has shrunk to 130.
    let users: Vec<User> = (0..130)
        .map(|i| user(&format!("u{:03}", i), &format!("u{:03}@x.com", i), "pw"))
        .collect();
    let mut source = VecSource::new(users);
    source.first_count = 300;

    let rows = export_entity(source, &path, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows, 130);

    let lines = data_rows(&path);
    assert_eq!(lines.len(), 130);
    // No duplicated windows.
    let mut ids: Vec<String> = lines
        .iter()
        .map(|l| l.split(',').next().unwrap().to_string())
        .collect();
    ids.dedup();
    assert_eq!(ids.len(), 130);
}

#[tokio::test]
async fn cancellation_keeps_only_published_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    let users: Vec<User> = (0..250)
        .map(|i| user(&format!("u{:03}", i), &format!("u{:03}@x.com", i), "pw"))
        .collect();
    let cancel = CancellationToken::new();
    let mut source = VecSource::new(users);
    // The token fires while the second page is being fetched, so only
    // the first page may reach the file.
    source.cancel_on_fetch = Some((2, cancel.clone()));

    let rows = export_entity(source, &path, &cancel).await.unwrap();
    assert_eq!(rows, 100);
    assert_eq!(data_rows(&path).len(), 100);
}

#[tokio::test]
async fn retrieval_failure_reports_window_and_keeps_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    let users: Vec<User> = (0..250)
        .map(|i| user(&format!("u{:03}", i), &format!("u{:03}@x.com", i), "pw"))
        .collect();
    let mut source = VecSource::new(users);
    source.fail_at_offset = Some(100);

    let err = export_entity(source, &path, &CancellationToken::new())
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("offset 100"));
    assert!(msg.contains("retrieving users"));

    // The first page is preserved, not rolled back.
    assert_eq!(data_rows(&path).len(), 100);
}

// ============================================================================
// End to end: export then import
// ============================================================================

async fn export_fixture(dir: &Path) {
    let cancel = CancellationToken::new();

    let users = vec![
        user("u1", "u1@x.com", "pw1"),
        user("u2", "u2@x.com", "pw2"),
        user("u3", "u3@x.com", "pw3"),
    ];
    export_entity(VecSource::new(users), &dir.join("users.csv"), &cancel)
        .await
        .unwrap();

    let things = vec![
        Thing {
            id: "t1".to_string(),
            owner: "u2@x.com".to_string(),
            name: "sensor".to_string(),
            key: "k1".to_string(),
            metadata: Metadata::new(),
        },
        Thing {
            id: "t2".to_string(),
            owner: "ghost@x.com".to_string(),
            name: "valve".to_string(),
            key: "k2".to_string(),
            metadata: Metadata::new(),
        },
    ];
    export_entity(VecSource::new(things), &dir.join("things.csv"), &cancel)
        .await
        .unwrap();

    let channels = vec![Channel {
        id: "c1".to_string(),
        owner: "u1@x.com".to_string(),
        name: "telemetry".to_string(),
        metadata: Metadata::new(),
    }];
    export_entity(VecSource::new(channels), &dir.join("channels.csv"), &cancel)
        .await
        .unwrap();

    let connections = vec![
        Connection {
            channel_id: "c1".to_string(),
            channel_owner: "u1@x.com".to_string(),
            thing_id: "t1".to_string(),
            thing_owner: "u2@x.com".to_string(),
        },
        Connection {
            channel_id: "c1".to_string(),
            channel_owner: "u1@x.com".to_string(),
            thing_id: "t2".to_string(),
            thing_owner: "ghost@x.com".to_string(),
        },
        // Duplicate edge, deduplicated on import.
        Connection {
            channel_id: "c1".to_string(),
            channel_owner: "u1@x.com".to_string(),
            thing_id: "t1".to_string(),
            thing_owner: "u2@x.com".to_string(),
        },
    ];
    export_entity(
        VecSource::new(connections),
        &dir.join("connections.csv"),
        &cancel,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn round_trip_resolves_owners_to_exported_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    export_fixture(dir.path()).await;

    // The exported users file is header plus one row per user.
    let content = std::fs::read_to_string(dir.path().join("users.csv")).unwrap();
    assert_eq!(content.lines().count(), 4);

    let platform = Arc::new(RecordingPlatform::default());
    let config = config_for(dir.path());
    import_all(&config, Arc::clone(&platform), &CancellationToken::new())
        .await
        .unwrap();

    let users = platform.users.lock().unwrap();
    assert_eq!(users.len(), 3);

    let things = platform.things.lock().unwrap();
    assert_eq!(things.len(), 2);
    // Owner email resolved to the exported identifier, not the literal.
    assert_eq!(things[0].owner, "u2");
    // Unresolved email keeps the raw string (known leniency).
    assert_eq!(things[1].owner, "ghost@x.com");
    // Every other field survives the round trip unchanged.
    assert_eq!(things[0].id, "t1");
    assert_eq!(things[0].key, "k1");
    assert_eq!(things[0].name, "sensor");

    let channels = platform.channels.lock().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].owner, "u1");

    let connects = platform.connects.lock().unwrap();
    assert_eq!(connects.len(), 1);
    assert_eq!(connects[0].0, "c1");
    assert_eq!(
        connects[0].1,
        vec!["t1".to_string(), "t2".to_string()]
    );
}

#[tokio::test]
async fn authentication_failure_aborts_import() {
    let dir = tempfile::tempdir().unwrap();
    export_fixture(dir.path()).await;

    let platform = Arc::new(RecordingPlatform {
        fail_token: true,
        ..Default::default()
    });
    let config = config_for(dir.path());
    let err = import_all(&config, Arc::clone(&platform), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
    assert!(platform.users.lock().unwrap().is_empty());
    assert!(platform.things.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_kind_is_reported_but_later_kinds_still_run() {
    let dir = tempfile::tempdir().unwrap();
    export_fixture(dir.path()).await;

    let platform = Arc::new(RecordingPlatform {
        fail_things: true,
        ..Default::default()
    });
    let config = config_for(dir.path());
    let err = import_all(&config, Arc::clone(&platform), &CancellationToken::new())
        .await
        .unwrap_err();

    // The things failure carries the batch identifiers...
    let msg = err.to_string();
    assert!(msg.contains("creating things"));
    assert!(msg.contains("t1"));

    // ...and channels and connections were still attempted.
    assert_eq!(platform.channels.lock().unwrap().len(), 1);
    assert_eq!(platform.connects.lock().unwrap().len(), 1);
}

// ============================================================================
// Orchestrator dispatch
// ============================================================================

#[tokio::test]
async fn unknown_export_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.operation = Operation::Export;
    config.from_version = "9.9.9".to_string();

    let err = migrate(&config, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unsupported migration"));
}

#[tokio::test]
async fn unknown_import_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.to_version = "0.15.0".to_string();

    let err = migrate(&config, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unsupported migration"));
}
