//! Paged source implementation over a Postgres pool.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, instrument};

use pindah_core::error::{RecordError, SourceError};
use pindah_core::{Channel, Connection, EntityKind, EntityPage, Metadata, PageMeta, PageSource, Result, Thing, User};

use crate::queries::EntityQueries;

/// Decode one source row into an entity.
pub trait FromSourceRow: Sized {
    fn from_source_row(row: &PgRow) -> Result<Self>;
}

fn column<T>(row: &PgRow, name: &str) -> Result<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|e| {
        SourceError::Query {
            message: format!("column {}: {}", name, e),
        }
        .into()
    })
}

/// Decode a jsonb metadata column; NULL decodes to the empty map.
fn metadata_column(row: &PgRow, name: &str) -> Result<Metadata> {
    let value: Option<serde_json::Value> = column(row, name)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(Metadata::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(other) => Err(RecordError::Metadata {
            message: format!("expected a JSON object, found {}", other),
        }
        .into()),
    }
}

impl FromSourceRow for User {
    fn from_source_row(row: &PgRow) -> Result<Self> {
        Ok(User {
            id: column(row, "id")?,
            email: column(row, "email")?,
            password: column(row, "password")?,
            metadata: metadata_column(row, "metadata")?,
        })
    }
}

impl FromSourceRow for Thing {
    fn from_source_row(row: &PgRow) -> Result<Self> {
        Ok(Thing {
            id: column(row, "id")?,
            owner: column(row, "owner")?,
            name: column(row, "name")?,
            key: column(row, "key")?,
            metadata: metadata_column(row, "metadata")?,
        })
    }
}

impl FromSourceRow for Channel {
    fn from_source_row(row: &PgRow) -> Result<Self> {
        Ok(Channel {
            id: column(row, "id")?,
            owner: column(row, "owner")?,
            name: column(row, "name")?,
            metadata: metadata_column(row, "metadata")?,
        })
    }
}

impl FromSourceRow for Connection {
    fn from_source_row(row: &PgRow) -> Result<Self> {
        Ok(Connection {
            channel_id: column(row, "channel_id")?,
            channel_owner: column(row, "channel_owner")?,
            thing_id: column(row, "thing_id")?,
            thing_owner: column(row, "thing_owner")?,
        })
    }
}

/// A `PageSource` over one entity kind, driven by version-selected SQL.
///
/// Every fetch re-runs the count query, so the total reported with each
/// page reflects the source at that moment; callers tolerate drift.
#[derive(Debug, Clone)]
pub struct PgSource<T> {
    pool: PgPool,
    kind: EntityKind,
    queries: EntityQueries,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PgSource<T> {
    /// Create a paged source for one entity kind.
    pub fn new(pool: PgPool, kind: EntityKind, queries: EntityQueries) -> Self {
        Self {
            pool,
            kind,
            queries,
            _marker: PhantomData,
        }
    }

    async fn count_rows(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar(self.queries.count)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SourceError::Count {
                operation: format!("retrieving {}", self.kind),
                message: e.to_string(),
            })?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl<T> PageSource<T> for PgSource<T>
where
    T: FromSourceRow + Send + Sync,
{
    async fn count(&self) -> Result<u64> {
        self.count_rows().await
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<EntityPage<T>> {
        debug!(offset, limit, "fetching page");

        let rows = sqlx::query(self.queries.page)
            .bind(offset as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourceError::Query {
                message: e.to_string(),
            })?;

        let items = rows
            .iter()
            .map(T::from_source_row)
            .collect::<Result<Vec<_>>>()?;

        let total = self.count_rows().await?;

        Ok(EntityPage {
            items,
            meta: PageMeta {
                total,
                offset,
                limit,
            },
        })
    }
}
