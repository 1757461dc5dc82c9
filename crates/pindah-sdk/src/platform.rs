//! Platform API implementation over HTTP.

use async_trait::async_trait;
use tracing::{debug, instrument};

use pindah_core::error::ApiError;
use pindah_core::{AccessToken, Channel, Credentials, Metadata, Platform, Result, Thing, User};

use crate::base_url::BaseUrl;
use crate::client::HttpClient;

/// Endpoint for token issue, relative to the users service.
const TOKEN_ISSUE: &str = "users/tokens/issue";

/// Endpoint for bulk user creation, relative to the users service.
const USERS_BULK: &str = "users/bulk";

/// Endpoint for bulk thing creation, relative to the things service.
const THINGS_BULK: &str = "things/bulk";

/// Endpoint for bulk channel creation, relative to the things service.
const CHANNELS_BULK: &str = "channels/bulk";

/// Endpoint for thing-to-channel connection, relative to the things service.
const CONNECT: &str = "connect";

/// Record status sent with every created record.
const STATUS_ENABLED: &str = "enabled";

/// Base URLs for the destination platform services.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    pub users_url: BaseUrl,
    pub things_url: BaseUrl,
}

/// Request body for token issue.
#[derive(Debug, serde::Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

/// Response from token issue.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WireCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WireUser {
    #[serde(default)]
    id: String,
    credentials: WireCredentials,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    status: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WireThing {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: String,
    credentials: WireCredentials,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    status: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WireChannel {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    status: String,
}

#[derive(Debug, serde::Deserialize)]
struct CreateUsersResponse {
    users: Vec<WireUser>,
}

#[derive(Debug, serde::Deserialize)]
struct CreateThingsResponse {
    things: Vec<WireThing>,
}

#[derive(Debug, serde::Deserialize)]
struct CreateChannelsResponse {
    channels: Vec<WireChannel>,
}

/// Request body for connecting things to channels.
#[derive(Debug, serde::Serialize)]
struct ConnectRequest<'a> {
    channel_ids: Vec<&'a str>,
    thing_ids: &'a [String],
}

impl From<&User> for WireUser {
    fn from(user: &User) -> Self {
        WireUser {
            id: user.id.clone(),
            credentials: WireCredentials {
                identity: Some(user.email.clone()),
                secret: Some(user.password.clone()),
            },
            metadata: user.metadata.clone(),
            status: STATUS_ENABLED.to_string(),
        }
    }
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        User {
            id: wire.id,
            email: wire.credentials.identity.unwrap_or_default(),
            password: wire.credentials.secret.unwrap_or_default(),
            metadata: wire.metadata,
        }
    }
}

impl From<&Thing> for WireThing {
    fn from(thing: &Thing) -> Self {
        WireThing {
            id: thing.id.clone(),
            name: thing.name.clone(),
            owner: thing.owner.clone(),
            credentials: WireCredentials {
                identity: None,
                secret: Some(thing.key.clone()),
            },
            metadata: thing.metadata.clone(),
            status: STATUS_ENABLED.to_string(),
        }
    }
}

impl From<WireThing> for Thing {
    fn from(wire: WireThing) -> Self {
        Thing {
            id: wire.id,
            owner: wire.owner,
            name: wire.name,
            key: wire.credentials.secret.unwrap_or_default(),
            metadata: wire.metadata,
        }
    }
}

impl From<&Channel> for WireChannel {
    fn from(channel: &Channel) -> Self {
        WireChannel {
            id: channel.id.clone(),
            name: channel.name.clone(),
            owner: channel.owner.clone(),
            metadata: channel.metadata.clone(),
            status: STATUS_ENABLED.to_string(),
        }
    }
}

impl From<WireChannel> for Channel {
    fn from(wire: WireChannel) -> Self {
        Channel {
            id: wire.id,
            owner: wire.owner,
            name: wire.name,
            metadata: wire.metadata,
        }
    }
}

/// A network-backed platform implementation.
#[derive(Debug, Clone)]
pub struct HttpPlatform {
    config: SdkConfig,
    client: HttpClient,
}

impl HttpPlatform {
    /// Create a new platform client for the given service URLs.
    pub fn new(config: SdkConfig) -> Self {
        Self {
            config,
            client: HttpClient::new(),
        }
    }

    /// Returns the configured service URLs.
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    #[instrument(skip(self, credentials))]
    async fn create_token(&self, credentials: &Credentials) -> Result<AccessToken> {
        let request = TokenRequest {
            identity: credentials.identity(),
            secret: credentials.secret(),
        };

        let url = self.config.users_url.endpoint(TOKEN_ISSUE);
        let response: TokenResponse =
            self.client.post(&url, &request).await.map_err(|e| {
                ApiError::Auth {
                    message: e.to_string(),
                }
            })?;

        debug!("issued access token");
        Ok(AccessToken::new(response.access_token))
    }

    #[instrument(skip(self, users, token), fields(count = users.len()))]
    async fn create_users(&self, users: &[User], token: &AccessToken) -> Result<Vec<User>> {
        let request: Vec<WireUser> = users.iter().map(WireUser::from).collect();

        let url = self.config.users_url.endpoint(USERS_BULK);
        let response: CreateUsersResponse =
            self.client.post_authed(&url, &request, token).await?;

        Ok(response.users.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self, things, token), fields(count = things.len()))]
    async fn create_things(&self, things: &[Thing], token: &AccessToken) -> Result<Vec<Thing>> {
        let request: Vec<WireThing> = things.iter().map(WireThing::from).collect();

        let url = self.config.things_url.endpoint(THINGS_BULK);
        let response: CreateThingsResponse =
            self.client.post_authed(&url, &request, token).await?;

        Ok(response.things.into_iter().map(Thing::from).collect())
    }

    #[instrument(skip(self, channels, token), fields(count = channels.len()))]
    async fn create_channels(
        &self,
        channels: &[Channel],
        token: &AccessToken,
    ) -> Result<Vec<Channel>> {
        let request: Vec<WireChannel> = channels.iter().map(WireChannel::from).collect();

        let url = self.config.things_url.endpoint(CHANNELS_BULK);
        let response: CreateChannelsResponse =
            self.client.post_authed(&url, &request, token).await?;

        Ok(response.channels.into_iter().map(Channel::from).collect())
    }

    #[instrument(skip(self, thing_ids, token), fields(things = thing_ids.len()))]
    async fn connect(
        &self,
        channel_id: &str,
        thing_ids: &[String],
        token: &AccessToken,
    ) -> Result<()> {
        let request = ConnectRequest {
            channel_ids: vec![channel_id],
            thing_ids,
        };

        let url = self.config.things_url.endpoint(CONNECT);
        self.client
            .post_authed_no_response(&url, &request, token)
            .await
    }
}
