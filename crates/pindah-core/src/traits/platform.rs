//! Destination platform trait.

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::records::{Channel, Thing, User};
use crate::tokens::AccessToken;
use crate::Result;

/// The destination platform's creation API.
///
/// Records are only ever created, never updated or deleted; each bulk
/// call either creates its whole batch or fails as a unit.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Authenticate and obtain an access token.
    async fn create_token(&self, credentials: &Credentials) -> Result<AccessToken>;

    /// Create a batch of users, returning them as created.
    async fn create_users(&self, users: &[User], token: &AccessToken) -> Result<Vec<User>>;

    /// Create a batch of things, returning them as created.
    async fn create_things(&self, things: &[Thing], token: &AccessToken) -> Result<Vec<Thing>>;

    /// Create a batch of channels, returning them as created.
    async fn create_channels(
        &self,
        channels: &[Channel],
        token: &AccessToken,
    ) -> Result<Vec<Channel>>;

    /// Connect a set of things to one channel.
    async fn connect(
        &self,
        channel_id: &str,
        thing_ids: &[String],
        token: &AccessToken,
    ) -> Result<()>;
}
