//! Validated API base URL.

use std::fmt;
use std::str::FromStr;

use url::Url;

use pindah_core::error::ConfigError;
use pindah_core::Error;

/// A validated base URL for one platform service.
///
/// # Example
///
/// ```
/// use pindah_sdk::BaseUrl;
///
/// let base = BaseUrl::new("http://localhost:9000").unwrap();
/// assert_eq!(base.endpoint("things/bulk"), "http://localhost:9000/things/bulk");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Create a base URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not absolute http(s) with a host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| ConfigError::InvalidUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidUrl {
                value: s.to_string(),
                reason: "must use http or https".to_string(),
            }
            .into());
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                value: s.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(Self(url))
    }

    /// Returns the full URL for an API endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path)
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BaseUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_http_url() {
        let base = BaseUrl::new("http://things.internal:9000").unwrap();
        assert_eq!(
            base.endpoint("channels/bulk"),
            "http://things.internal:9000/channels/bulk"
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let base = BaseUrl::new("https://platform.example.com/").unwrap();
        assert_eq!(
            base.endpoint("connect"),
            "https://platform.example.com/connect"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(BaseUrl::new("ftp://example.com").is_err());
        assert!(BaseUrl::new("/users").is_err());
    }
}
