//! HTTP client plumbing for the platform API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, trace};

use pindah_core::error::{ApiError, StatusError};
use pindah_core::{AccessToken, Error};

/// Error body shape returned by the platform services.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct PlatformErrorResponse {
    pub error: Option<String>,
    #[serde(alias = "msg")]
    pub message: Option<String>,
}

/// HTTP client for platform requests.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new platform HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pindah/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Make an unauthenticated POST request.
    #[instrument(skip(self, body))]
    pub async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        debug!(%url, "platform request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    #[instrument(skip(self, body, token))]
    pub async fn post_authed<B, R>(&self, url: &str, body: &B, token: &AccessToken) -> Result<R, Error>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        debug!(%url, "authenticated platform request");

        let response = self
            .client
            .post(url)
            .json(body)
            .headers(self.auth_headers(token))
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request that returns no content.
    #[instrument(skip(self, body, token))]
    pub async fn post_authed_no_response<B>(
        &self,
        url: &str,
        body: &B,
        token: &AccessToken,
    ) -> Result<(), Error>
    where
        B: Serialize,
    {
        debug!(%url, "authenticated platform request (no response)");

        let response = self
            .client
            .post(url)
            .json(body)
            .headers(self.auth_headers(token))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error = self.parse_error_response(response).await;
            Err(Error::Api(ApiError::Status(error)))
        }
    }

    /// Create authorization headers for authenticated requests.
    fn auth_headers(&self, token: &AccessToken) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", token.as_str());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).expect("invalid token characters"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Handle a platform response, parsing the body or error.
    async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, Error> {
        let status = response.status();
        trace!(status = %status, "platform response");

        if status.is_success() {
            let body = response.json::<R>().await.map_err(map_transport)?;
            Ok(body)
        } else {
            let error = self.parse_error_response(response).await;
            Err(Error::Api(ApiError::Status(error)))
        }
    }

    /// Parse a platform error response.
    async fn parse_error_response(&self, response: reqwest::Response) -> StatusError {
        let status = response.status().as_u16();

        match response.json::<PlatformErrorResponse>().await {
            Ok(body) => StatusError::new(status, body.error, body.message),
            Err(_) => StatusError::new(status, None, None),
        }
    }
}

fn map_transport(err: reqwest::Error) -> Error {
    Error::Api(ApiError::Http {
        message: err.to_string(),
    })
}
