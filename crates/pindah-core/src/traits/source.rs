//! Paged source trait.

use async_trait::async_trait;

use crate::records::EntityPage;
use crate::Result;

/// A paged view over one entity kind in the source system.
///
/// The paginator drives this trait with monotonically advancing offsets;
/// implementations run one parameterized page query per fetch and one
/// count query per call, so the reported total tracks a live source.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Count all rows of this entity kind.
    async fn count(&self) -> Result<u64>;

    /// Fetch one `(offset, limit)` window, along with the total observed
    /// at query time.
    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<EntityPage<T>>;
}
