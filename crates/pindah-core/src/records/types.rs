//! Entity types shared by the export and import pipelines.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::Metadata;

/// A platform user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier. Empty on source versions that key users by email.
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A registered device entity owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,
    /// Owner reference; on the source side this is the owner's email.
    pub owner: String,
    pub name: String,
    /// Secret key the thing authenticates with.
    pub key: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A named pub/sub topic entity owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One permitted thing-to-channel binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub channel_id: String,
    pub channel_owner: String,
    pub thing_id: String,
    pub thing_owner: String,
}

/// The four record kinds the migration moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Users,
    Things,
    Channels,
    Connections,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Users => "users",
            EntityKind::Things => "things",
            EntityKind::Channels => "channels",
            EntityKind::Connections => "connections",
        };
        write!(f, "{}", name)
    }
}

/// Pagination window metadata reported with each retrieved page.
///
/// `total` is re-read by the source on every fetch, so it may drift
/// between rounds while the source is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageMeta {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// One window of a larger result set.
#[derive(Debug, Clone)]
pub struct EntityPage<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(EntityKind::Users.to_string(), "users");
        assert_eq!(EntityKind::Connections.to_string(), "connections");
    }
}
