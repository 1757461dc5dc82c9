//! Per-version SQL text.
//!
//! Source schemas differ slightly across platform versions; the profile
//! selected once by the orchestrator is the only place those differences
//! live. Versions 0.10.0 and 0.11.0 have no user id column (users are
//! keyed by email), so their users query selects an empty id to keep the
//! row layout uniform for the rest of the pipeline.

/// The paged query and count query for one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct EntityQueries {
    pub page: &'static str,
    pub count: &'static str,
}

/// The full set of retrieval queries for one source version.
#[derive(Debug, Clone, Copy)]
pub struct VersionProfile {
    pub version: &'static str,
    pub users: EntityQueries,
    pub things: EntityQueries,
    pub channels: EntityQueries,
    pub connections: EntityQueries,
}

const USERS_PAGE: &str = "SELECT id, email, password, metadata FROM users OFFSET $1 LIMIT $2";
const USERS_PAGE_NO_ID: &str =
    "SELECT ''::text AS id, email, password, metadata FROM users OFFSET $1 LIMIT $2";
const USERS_COUNT: &str = "SELECT COUNT(*) FROM users";

const THINGS_PAGE: &str = "SELECT id, owner, name, key, metadata FROM things OFFSET $1 LIMIT $2";
const THINGS_COUNT: &str = "SELECT COUNT(*) FROM things";

const CHANNELS_PAGE: &str = "SELECT id, owner, name, metadata FROM channels OFFSET $1 LIMIT $2";
const CHANNELS_COUNT: &str = "SELECT COUNT(*) FROM channels";

const CONNECTIONS_PAGE: &str =
    "SELECT channel_id, channel_owner, thing_id, thing_owner FROM connections OFFSET $1 LIMIT $2";
const CONNECTIONS_COUNT: &str = "SELECT COUNT(*) FROM connections";

const THINGS: EntityQueries = EntityQueries {
    page: THINGS_PAGE,
    count: THINGS_COUNT,
};
const CHANNELS: EntityQueries = EntityQueries {
    page: CHANNELS_PAGE,
    count: CHANNELS_COUNT,
};
const CONNECTIONS: EntityQueries = EntityQueries {
    page: CONNECTIONS_PAGE,
    count: CONNECTIONS_COUNT,
};

const PROFILE_010: VersionProfile = VersionProfile {
    version: "0.10.0",
    users: EntityQueries {
        page: USERS_PAGE_NO_ID,
        count: USERS_COUNT,
    },
    things: THINGS,
    channels: CHANNELS,
    connections: CONNECTIONS,
};

const PROFILE_011: VersionProfile = VersionProfile {
    version: "0.11.0",
    users: EntityQueries {
        page: USERS_PAGE_NO_ID,
        count: USERS_COUNT,
    },
    things: THINGS,
    channels: CHANNELS,
    connections: CONNECTIONS,
};

const PROFILE_012: VersionProfile = VersionProfile {
    version: "0.12.0",
    users: EntityQueries {
        page: USERS_PAGE,
        count: USERS_COUNT,
    },
    things: THINGS,
    channels: CHANNELS,
    connections: CONNECTIONS,
};

const PROFILE_013: VersionProfile = VersionProfile {
    version: "0.13.0",
    users: EntityQueries {
        page: USERS_PAGE,
        count: USERS_COUNT,
    },
    things: THINGS,
    channels: CHANNELS,
    connections: CONNECTIONS,
};

impl VersionProfile {
    /// Resolve the retrieval profile for an export source version.
    pub fn for_export(version: &str) -> Option<VersionProfile> {
        match version {
            "0.10.0" => Some(PROFILE_010),
            "0.11.0" => Some(PROFILE_011),
            "0.12.0" => Some(PROFILE_012),
            "0.13.0" => Some(PROFILE_013),
            _ => None,
        }
    }
}
